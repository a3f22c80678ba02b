use std::path::{Component, Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{debug, instrument};

use crate::models::detection::{Extraction, OcrDetection, PixelRect, PlateRegion};
use crate::services::normalizer;
use crate::services::ocr::{OcrEngine, OcrError};

/// Margin added around a localized region before reading it.
pub const CROP_MARGIN: u32 = 10;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_SCALE: f32 = 22.0;

/// Label font used unless another one is configured.
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");

/// Where processing artifacts for an input image are written.
///
/// Artifacts mirror the input's path relative to the uploads root, under the
/// processed root instead.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub uploads_root: PathBuf,
    pub processed_root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(uploads_root: impl Into<PathBuf>, processed_root: impl Into<PathBuf>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
            processed_root: processed_root.into(),
        }
    }

    /// Path of the annotated copy of `image_path`.
    pub fn annotated_path(&self, image_path: &Path) -> PathBuf {
        if let Ok(relative) = image_path.strip_prefix(&self.uploads_root) {
            return self.processed_root.join(relative);
        }

        // Stored paths may be absolute while the root is relative, or the
        // other way around; mirror from the last occurrence of the root's name.
        if let Some(root_name) = self.uploads_root.file_name() {
            let components: Vec<_> = image_path.components().collect();
            if let Some(pos) = components.iter().rposition(|c| c.as_os_str() == root_name) {
                let relative: PathBuf = components[pos + 1..].iter().collect();
                if !relative.as_os_str().is_empty() {
                    return self.processed_root.join(relative);
                }
            }
        }

        // Outside the uploads root: keep every named component so that
        // same-named files from different directories stay apart.
        let relative: PathBuf = image_path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        debug!(
            image_path = %image_path.display(),
            uploads_root = %self.uploads_root.display(),
            "Image outside uploads root, mirroring its full path"
        );
        if relative.as_os_str().is_empty() {
            self.processed_root.join("unnamed.png")
        } else {
            self.processed_root.join(relative)
        }
    }

    /// Path of the saved plate crop, beside the annotated copy.
    pub fn cropped_plate_path(&self, image_path: &Path) -> PathBuf {
        let annotated = self.annotated_path(image_path);
        let stem = annotated
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame".to_string());
        let ext = annotated
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".to_string());
        annotated.with_file_name(format!("{stem}_plate.{ext}"))
    }
}

/// Reads text out of a frame and leaves an annotated audit copy behind.
pub struct TextExtractor {
    layout: ArtifactLayout,
    font: FontArc,
    min_len: usize,
}

impl TextExtractor {
    /// `min_len` is the admission threshold handed to the normalizer.
    ///
    /// Labels use the bundled DejaVu Sans Mono until [`Self::with_font_file`]
    /// swaps it.
    pub fn new(layout: ArtifactLayout, min_len: usize) -> Result<Self, ExtractionError> {
        let font = FontArc::try_from_slice(DEFAULT_FONT)
            .map_err(|e| ExtractionError::Font(format!("bundled font: {e}")))?;
        Ok(Self {
            layout,
            font,
            min_len,
        })
    }

    /// Draw labels with the font at `path` instead of the bundled one.
    pub fn with_font_file(mut self, path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        self.font = FontArc::try_from_vec(bytes)
            .map_err(|e| ExtractionError::Font(format!("{}: {e}", path.display())))?;
        Ok(self)
    }

    /// Read `frame`, restricted to `region` when one was localized.
    ///
    /// The OCR engine is invoked exactly once. Candidates keep detection
    /// order; ranking is left to the matcher.
    #[instrument(skip_all, fields(image_path = %image_path.display()))]
    pub async fn extract<E: OcrEngine>(
        &self,
        engine: &E,
        image_path: &Path,
        frame: &DynamicImage,
        region: Option<&PlateRegion>,
    ) -> Result<Extraction, ExtractionError> {
        let window = region
            .map(|r| {
                r.bounding_rect()
                    .expand_within(CROP_MARGIN, frame.width(), frame.height())
            })
            .filter(|w| !w.is_empty());

        let (input, origin) = match window {
            Some(w) => (crop(frame, w), (w.x as f32, w.y as f32)),
            None => (DynamicImage::ImageLuma8(frame.to_luma8()), (0.0, 0.0)),
        };

        let detections = engine.read_text(&input).await?;

        let mut candidates = Vec::new();
        let mut admitted = Vec::new();
        for detection in detections {
            if let Some(clean) = normalizer::admit(&detection.text, self.min_len) {
                debug!(
                    raw = %detection.text,
                    clean = %clean,
                    confidence = detection.confidence,
                    "Admitted candidate"
                );
                candidates.push(clean);
                admitted.push(detection.offset(origin.0, origin.1));
            }
        }

        let annotated = annotate(frame, &admitted, &self.font);
        let annotated_path = self.layout.annotated_path(image_path);
        save_rgb(&annotated, &annotated_path)?;

        let cropped_plate_path = match window {
            Some(_) => {
                let path = self.layout.cropped_plate_path(image_path);
                save_rgb(&input.to_rgb8(), &path)?;
                Some(path)
            }
            None => None,
        };

        Ok(Extraction {
            candidates,
            annotated_path,
            cropped_plate_path,
            localized: window.is_some(),
        })
    }
}

fn crop(frame: &DynamicImage, window: PixelRect) -> DynamicImage {
    frame.crop_imm(window.x, window.y, window.width, window.height)
}

/// Copy of `frame` with each detection boxed and labelled with its raw text.
fn annotate(frame: &DynamicImage, detections: &[OcrDetection], font: &FontArc) -> RgbImage {
    let mut canvas = frame.to_rgb8();
    for detection in detections {
        let Some(rect) = box_rect(&detection.bbox, canvas.width(), canvas.height()) else {
            continue;
        };
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                .of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(&mut canvas, inner, BOX_COLOR);
        }

        let y = (rect.top() - LABEL_SCALE as i32 - 4).max(0);
        draw_text_mut(
            &mut canvas,
            BOX_COLOR,
            rect.left(),
            y,
            PxScale::from(LABEL_SCALE),
            font,
            &detection.text,
        );
    }
    canvas
}

/// Axis-aligned rectangle from the top-left and bottom-right corners,
/// clipped to a `width` x `height` canvas.
fn box_rect(bbox: &[[f32; 2]; 4], width: u32, height: u32) -> Option<Rect> {
    let [top_left, _, bottom_right, _] = bbox;
    let clip_x = |v: f32| v.round().clamp(0.0, width as f32);
    let clip_y = |v: f32| v.round().clamp(0.0, height as f32);

    let x0 = clip_x(top_left[0].min(bottom_right[0]));
    let x1 = clip_x(top_left[0].max(bottom_right[0]));
    let y0 = clip_y(top_left[1].min(bottom_right[1]));
    let y1 = clip_y(top_left[1].max(bottom_right[1]));

    let (w, h) = ((x1 - x0) as u32, (y1 - y0) as u32);
    (w > 0 && h > 0).then(|| Rect::at(x0 as i32, y0 as i32).of_size(w, h))
}

/// Encoder for `path`, PNG when its extension names nothing writable.
fn output_format(path: &Path) -> ImageFormat {
    ImageFormat::from_path(path)
        .ok()
        .filter(ImageFormat::writing_enabled)
        .unwrap_or(ImageFormat::Png)
}

fn save_rgb(image: &RgbImage, path: &Path) -> Result<(), ExtractionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, output_format(path)).map_err(|source| ExtractionError::Save {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Failed to write artifact {path}: {source}")]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid annotation font: {0}")]
    Font(String),
}
