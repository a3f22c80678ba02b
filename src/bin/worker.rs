use echallan_anpr::{
    app_state::AppState,
    config::AppConfig,
    db::{self, store::PgViolationStore},
    routes,
    services::{
        extractor::{ArtifactLayout, TextExtractor},
        matcher::PgVehicleRegistry,
        normalizer::WORKER_MIN_PLATE_LEN,
        ocr::HttpOcrEngine,
        pipeline::PlatePipeline,
    },
    worker::Worker,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting ANPR violation worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    let prometheus_handle = Arc::new(
        routes::metrics::install_recorder().expect("Failed to install Prometheus recorder"),
    );

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // The OCR engine is built once and shared by every record and the health check.
    tracing::info!(endpoint = %config.ocr_endpoint, "Initializing OCR engine client");
    let ocr_engine = Arc::new(
        HttpOcrEngine::new(&config.ocr_endpoint, config.ocr_api_token.clone())
            .expect("Failed to initialize OCR engine client"),
    );

    let layout = ArtifactLayout::new(&config.uploads_dir, &config.processed_dir);
    std::fs::create_dir_all(&layout.processed_root)
        .expect("Failed to create processed directory");

    let mut extractor = TextExtractor::new(layout, WORKER_MIN_PLATE_LEN)
        .expect("Failed to load bundled annotation font");
    if let Some(font_path) = &config.annotation_font_path {
        extractor = extractor
            .with_font_file(Path::new(font_path))
            .expect("Failed to load annotation font");
    }

    // Health and metrics listener
    let state = AppState::new(db_pool.clone(), ocr_engine.clone());
    let app = routes::ops_router(state, prometheus_handle);
    let listener = tokio::net::TcpListener::bind(&config.ops_bind_addr)
        .await
        .expect("Failed to bind ops address");
    tracing::info!("Ops endpoints listening on {}", config.ops_bind_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Ops server stopped");
        }
    });

    let worker = Worker::new(
        PgViolationStore::new(db_pool.clone()),
        PgVehicleRegistry::new(db_pool),
        PlatePipeline::new(ocr_engine, extractor),
    );

    worker.run().await;
}
