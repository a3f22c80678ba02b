use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, ImageReader};
use tracing::{info, instrument};

use crate::models::detection::Extraction;
use crate::models::violation::Violation;
use crate::services::extractor::{ExtractionError, TextExtractor};
use crate::services::localizer;
use crate::services::matcher::{self, PlateMatch, RegistryError, VehicleRegistry};
use crate::services::ocr::OcrEngine;

/// Long-lived recognition service.
///
/// Owns the OCR engine handle, which is expensive to bring up, so it is built
/// once and reused for every frame the process reads.
pub struct PlatePipeline<E> {
    engine: E,
    extractor: TextExtractor,
}

impl<E: OcrEngine> PlatePipeline<E> {
    pub fn new(engine: E, extractor: TextExtractor) -> Self {
        Self { engine, extractor }
    }

    /// Decode, localize and read one image file.
    ///
    /// The decoder is chosen from the file's contents, so uploads kept under a
    /// wrong or missing extension still decode. A missing plate region is not
    /// an error: the whole frame is read instead.
    #[instrument(skip_all, fields(image_path = %image_path.display()))]
    pub async fn recognize(&self, image_path: &Path) -> Result<Extraction, PipelineError> {
        let path = image_path.to_path_buf();
        let (frame, region) = tokio::task::spawn_blocking(move || {
            let frame =
                decode_frame(&path).map_err(|source| PipelineError::ImageLoad { path, source })?;
            let region = localizer::locate_plate(&frame);
            Ok::<_, PipelineError>((frame, region))
        })
        .await??;

        match &region {
            Some(r) => info!(corners = ?r.corners, area = r.contour_area, "Plate region localized"),
            None => {
                metrics::counter!("anpr_localization_fallbacks_total").increment(1);
                info!("No plate region found, reading full frame");
            }
        }

        let started = Instant::now();
        let extraction = self
            .extractor
            .extract(&self.engine, image_path, &frame, region.as_ref())
            .await?;

        info!(
            ocr_duration_ms = started.elapsed().as_millis() as u64,
            candidates = ?extraction.candidates,
            annotated_path = %extraction.annotated_path.display(),
            "Text extraction complete"
        );

        Ok(extraction)
    }

    /// One full pass for a violation: recognize its image and resolve the plate.
    pub async fn run_pass<R: VehicleRegistry>(
        &self,
        violation: &Violation,
        registry: &R,
    ) -> Result<(PlateMatch, Extraction), PipelineError> {
        let extraction = self.recognize(Path::new(&violation.image_path)).await?;
        let plate = matcher::resolve_plate(&extraction.candidates, registry).await?;
        Ok((plate, extraction))
    }
}

fn decode_frame(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Image decoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
