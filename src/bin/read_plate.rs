//! Read the plate on a single captured image.
//!
//! Runs localization and OCR on one file and prints the joined plate text,
//! without touching the database.
//!
//! Usage:
//!   read_plate <image> [output_dir]
//!
//! Prerequisites:
//!   - OCR_ENDPOINT (and optionally OCR_API_TOKEN) in the environment or .env
//!   - ANNOTATION_FONT_PATH to label with a font other than the bundled one

use echallan_anpr::services::{
    extractor::{ArtifactLayout, TextExtractor},
    normalizer::{self, DEMO_MIN_PLATE_LEN},
    ocr::HttpOcrEngine,
    pipeline::PlatePipeline,
};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = env::args().skip(1);
    let Some(image_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: read_plate <image> [output_dir]");
        return Ok(ExitCode::from(2));
    };
    let output_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("processed_uploads"));

    let endpoint = env::var("OCR_ENDPOINT").map_err(|_| "OCR_ENDPOINT not set")?;
    let engine = HttpOcrEngine::new(&endpoint, env::var("OCR_API_TOKEN").ok())?;

    let uploads_root = image_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let mut extractor =
        TextExtractor::new(ArtifactLayout::new(uploads_root, output_dir), DEMO_MIN_PLATE_LEN)?;
    if let Ok(font_path) = env::var("ANNOTATION_FONT_PATH") {
        extractor = extractor.with_font_file(Path::new(&font_path))?;
    }

    let pipeline = PlatePipeline::new(engine, extractor);
    let extraction = pipeline.recognize(&image_path).await?;

    if !extraction.localized {
        println!("No plate region localized; read the full frame.");
    }
    if let Some(crop) = &extraction.cropped_plate_path {
        println!("Plate crop:      {}", crop.display());
    }
    println!("Annotated image: {}", extraction.annotated_path.display());

    match normalizer::join_fragments(&extraction.candidates) {
        Some(plate) => {
            println!("Plate text:      {plate}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Could not read plate text: OCR returned no valid strings.");
            Ok(ExitCode::FAILURE)
        }
    }
}
