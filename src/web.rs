//! Prediction web form.
//!
//! `GET /` and `GET /predict` serve the form, `POST /predict` scores the
//! submitted patient with the model loaded at startup.

pub mod handlers;
pub mod templates;

use crate::error::Result;
use crate::prediction::PredictionPipeline;
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Shared state: the model is loaded once and reused by every request.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PredictionPipeline>,
}

impl AppState {
    pub fn new(pipeline: PredictionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/predict", get(handlers::home).post(handlers::predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Prediction form listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
