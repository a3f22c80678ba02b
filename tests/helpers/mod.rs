//! Test helper utilities: a scripted OCR engine and on-disk frames

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use echallan_anpr::db::memory::InMemoryViolationStore;
use echallan_anpr::models::detection::OcrDetection;
use echallan_anpr::services::extractor::{ArtifactLayout, TextExtractor};
use echallan_anpr::services::normalizer::WORKER_MIN_PLATE_LEN;
use echallan_anpr::services::ocr::{OcrEngine, OcrError};
use echallan_anpr::services::pipeline::PlatePipeline;
use echallan_anpr::worker::Worker;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use uuid::Uuid;

/// One scripted engine reply.
pub enum Reply {
    Read(Vec<OcrDetection>),
    Crash,
}

/// OCR engine that replays scripted replies in call order.
///
/// Calls beyond the script read nothing. Every call records the size of the
/// image it was handed.
#[derive(Default)]
pub struct ScriptedOcrEngine {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedOcrEngine {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl OcrEngine for ScriptedOcrEngine {
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<OcrDetection>, OcrError> {
        self.calls.lock().unwrap().push((image.width(), image.height()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Read(detections)) => Ok(detections),
            Some(Reply::Crash) => Err(OcrError::Config("engine crashed".to_string())),
            None => Ok(Vec::new()),
        }
    }
}

/// Detection with a plausible box, as the engine would return it.
pub fn detection(text: &str) -> OcrDetection {
    OcrDetection {
        bbox: [[12.0, 14.0], [140.0, 14.0], [140.0, 44.0], [12.0, 44.0]],
        text: text.to_string(),
        confidence: 0.88,
    }
}

pub fn read(texts: &[&str]) -> Reply {
    Reply::Read(texts.iter().map(|t| detection(t)).collect())
}

/// Fresh uploads/processed directory pair under the cargo tmp dir.
pub struct Sandbox {
    pub root: PathBuf,
    pub layout: ArtifactLayout,
}

impl Sandbox {
    pub fn new() -> Self {
        let root =
            PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(format!("anpr-{}", Uuid::new_v4()));
        let layout = ArtifactLayout::new(root.join("uploads"), root.join("processed_uploads"));
        std::fs::create_dir_all(&layout.uploads_root).expect("Failed to create uploads dir");
        Self { root, layout }
    }

    fn upload_path(&self, name: &str) -> PathBuf {
        let path = self.layout.uploads_root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create upload subdir");
        }
        path
    }

    /// Featureless frame: no contour, so the full frame gets read.
    pub fn blank_frame(&self, name: &str) -> PathBuf {
        let path = self.upload_path(name);
        RgbImage::from_pixel(320, 240, Rgb([96, 96, 96]))
            .save(&path)
            .expect("Failed to write frame");
        path
    }

    /// Featureless frame encoded as `format`, whatever `name` suggests.
    pub fn blank_frame_as(&self, name: &str, format: ImageFormat) -> PathBuf {
        let path = self.upload_path(name);
        RgbImage::from_pixel(320, 240, Rgb([96, 96, 96]))
            .save_with_format(&path, format)
            .expect("Failed to write frame");
        path
    }

    /// Dark frame with one bright plate-shaped rectangle.
    pub fn plate_frame(&self, name: &str) -> PathBuf {
        let path = self.upload_path(name);
        let mut img = RgbImage::from_pixel(480, 360, Rgb([35, 35, 35]));
        draw_filled_rect_mut(&mut img, Rect::at(150, 200).of_size(180, 50), Rgb([230, 230, 230]));
        img.save(&path).expect("Failed to write frame");
        path
    }

    /// File with an image extension and garbage content.
    pub fn corrupt_frame(&self, name: &str) -> PathBuf {
        let path = self.upload_path(name);
        std::fs::write(&path, b"definitely not a jpeg").expect("Failed to write file");
        path
    }

    pub fn missing_frame(&self, name: &str) -> PathBuf {
        self.layout.uploads_root.join(name)
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub type TestWorker = Worker<InMemoryViolationStore, HashSet<String>, Arc<ScriptedOcrEngine>>;

pub fn worker(sandbox: &Sandbox, registry: &[&str], engine: Arc<ScriptedOcrEngine>) -> TestWorker {
    let extractor = TextExtractor::new(sandbox.layout.clone(), WORKER_MIN_PLATE_LEN)
        .expect("Failed to build extractor");
    Worker::new(
        InMemoryViolationStore::new(),
        registry.iter().map(|p| p.to_string()).collect(),
        PlatePipeline::new(engine, extractor),
    )
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
