use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string (violations and vehicle registry)
    pub database_url: String,

    /// OCR engine endpoint (e.g., "http://127.0.0.1:8866/ocr")
    pub ocr_endpoint: String,

    /// Bearer token for the OCR engine, if it requires one
    #[serde(default)]
    pub ocr_api_token: Option<String>,

    /// Root directory uploaded violation images live under
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Root directory annotated artifacts are mirrored into
    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,

    /// Font used to draw raw OCR text on annotated images. The bundled font when unset.
    #[serde(default)]
    pub annotation_font_path: Option<String>,

    /// Health and metrics listener address
    #[serde(default = "default_ops_bind_addr")]
    pub ops_bind_addr: String,
}

fn default_uploads_dir() -> String {
    "uploads".to_string()
}

fn default_processed_dir() -> String {
    "processed_uploads".to_string()
}

fn default_ops_bind_addr() -> String {
    "0.0.0.0:9100".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
