//! HTTP surface: the four image actions as JSON / multipart endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ToolkitConfig;
use crate::core::generate::ArkImageGenerator;
use crate::core::recognize::ArkImageRecognizer;
use crate::core::remove_bg::RemoveBgClient;
use crate::core::{BackgroundRemover, ImageGenerator, ImageRecognizer};
use crate::utils::error::Result;

mod error;
pub mod handlers;

/// Uploads above this size are rejected before reaching a handler.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared across handlers; vendor clients are stateless so one instance each suffices.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn ImageGenerator>,
    pub recognizer: Arc<dyn ImageRecognizer>,
    pub remover: Arc<dyn BackgroundRemover>,
    pub default_quality: u8,
}

impl AppState {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        recognizer: Arc<dyn ImageRecognizer>,
        remover: Arc<dyn BackgroundRemover>,
        default_quality: u8,
    ) -> Self {
        Self {
            generator,
            recognizer,
            remover,
            default_quality,
        }
    }

    pub fn from_config(config: &ToolkitConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(ArkImageGenerator::new(config.clone())?),
            Arc::new(ArkImageRecognizer::new(config.clone())?),
            Arc::new(RemoveBgClient::new(config.clone())?),
            config.compress.default_quality,
        ))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/generate-image", post(handlers::generate_image))
        .route("/api/recognize", post(handlers::recognize))
        .route("/api/remove-bg", post(handlers::remove_bg))
        .route("/api/compress", post(handlers::compress_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &ToolkitConfig) -> Result<()> {
    if config.ark.api_key.is_none() {
        tracing::warn!("ARK_API_KEY is not set; generation and recognition will fail");
    }
    if config.remove_bg.api_key.is_none() {
        tracing::warn!("REMOVE_BG_API_KEY is not set; background removal will fail");
    }

    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
