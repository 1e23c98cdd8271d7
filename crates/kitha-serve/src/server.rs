//! HTTP surface: `GET /health` and `POST /predict`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ServeConfig;
use crate::context::{ModelContext, Prediction, DEVICE};
use crate::error::{PredictError, ServeResult};
use crate::logging::RequestLoggerLayer;

/// Shared by every handler. `None` until a model is loaded.
#[derive(Clone, Default)]
pub struct ServiceState {
    pub context: Option<Arc<ModelContext>>,
}

impl ServiceState {
    #[must_use]
    pub fn loaded(context: ModelContext) -> Self {
        Self { context: Some(Arc::new(context)) }
    }

    #[must_use]
    pub fn unloaded() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub tokenizer_loaded: bool,
    pub device: Option<&'static str>,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let loaded = state.context.is_some();
    Json(HealthResponse {
        status: "healthy",
        model_loaded: loaded,
        tokenizer_loaded: loaded,
        device: loaded.then_some(DEVICE),
    })
}

async fn predict(
    State(state): State<ServiceState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<Prediction>, PredictError> {
    let context = state.context.as_ref().ok_or(PredictError::NotLoaded)?;
    let Json(request) = body?;
    let prediction = context.predict(&request.text)?;
    info!(chars = request.text.trim().chars().count(), ai_prob = prediction.ai_prob, "Prediction");
    Ok(Json(prediction))
}

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(CorsLayer::permissive())
        .layer(RequestLoggerLayer)
        .with_state(state)
}

/// Load the model, then bind and serve until Ctrl-C.
pub async fn run(config: &ServeConfig) -> ServeResult<()> {
    let context = ModelContext::load(config).await?;
    info!(dir = %context.source().dir().display(), "Model loaded");

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Prediction service listening");

    axum::serve(listener, router(ServiceState::loaded(context)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
