use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use garde::Validate;
use image::{DynamicImage, ImageFormat};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::detection::OcrDetection;

/// Text recognizer that maps an image to located text fragments.
///
/// Implementations are built once and reused for every frame; detections come
/// back in the engine's reading order.
pub trait OcrEngine {
    fn read_text(
        &self,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<Vec<OcrDetection>, OcrError>> + Send;
}

impl<E: OcrEngine + Send + Sync> OcrEngine for Arc<E> {
    fn read_text(
        &self,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<Vec<OcrDetection>, OcrError>> + Send {
        (**self).read_text(image)
    }
}

/// Client for an OCR engine served over HTTP (EasyOCR/PaddleOCR sidecar).
pub struct HttpOcrEngine {
    http: Client,
    endpoint: Url,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct OcrResponse {
    detections: Vec<OcrDetection>,
}

impl HttpOcrEngine {
    pub fn new(endpoint: &str, api_token: Option<String>) -> Result<Self, OcrError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| OcrError::Config(format!("invalid OCR endpoint {endpoint:?}: {e}")))?;
        let http = Client::builder()
            .user_agent(concat!("echallan-anpr/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_token,
        })
    }

    /// Check the engine answers HTTP at all (for health checks).
    pub async fn health_check(&self) -> Result<(), OcrError> {
        self.http.get(self.endpoint.clone()).send().await?;
        Ok(())
    }
}

impl OcrEngine for HttpOcrEngine {
    /// Send one image to the engine and collect its detections.
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<OcrDetection>, OcrError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let request_body = serde_json::json!({
            "image": base64::engine::general_purpose::STANDARD.encode(&png),
            "languages": ["en"],
        });

        let mut request = self.http.post(self.endpoint.clone()).json(&request_body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response: OcrResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            raw_detections = response.detections.len(),
            width = image.width(),
            height = image.height(),
            "OCR engine responded"
        );

        Ok(accept_detections(response.detections))
    }
}

/// Drop detections that fail validation, keeping order.
pub fn accept_detections(detections: Vec<OcrDetection>) -> Vec<OcrDetection> {
    detections
        .into_iter()
        .filter(|d| match d.validate() {
            Ok(()) => true,
            Err(report) => {
                warn!(text = %d.text, error = %report, "Discarding invalid OCR detection");
                false
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine configuration error: {0}")]
    Config(String),

    #[error("Failed to encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),

    #[error("OCR engine request failed: {0}")]
    Http(#[from] reqwest::Error),
}
