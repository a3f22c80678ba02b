use sqlx::PgPool;
use std::sync::Arc;

use crate::services::ocr::HttpOcrEngine;

/// Shared state for the worker's health and metrics routes.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub ocr: Arc<HttpOcrEngine>,
}

impl AppState {
    pub fn new(db: PgPool, ocr: Arc<HttpOcrEngine>) -> Self {
        Self { db, ocr }
    }
}
