//! HTTP transport for the prediction service.
//!
//! Handlers only parse, delegate to [`crate::inference`] and map errors; the
//! artifact is shared through axum state and never mutated.

pub mod cors;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use http_body_util::LengthLimitError;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{ConfigError, ServerSettings};
use crate::inference::{self, PredictionResult};
use crate::model_store::{ModelArtifact, ModelStore, ModelSummary};

pub use cors::{CorsPolicy, cors_middleware};
pub use error::{ApiError, INTERNAL_MESSAGE};

/// Route from the original client form, kept as an alias of `/predict`.
pub const LEGACY_PREDICT_ROUTE: &str = "/api/predict-success";

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub model: Arc<ModelArtifact>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: &ModelStore, max_body_bytes: usize) -> Self {
        Self {
            model: store.handle(),
            max_body_bytes,
        }
    }
}

/// Build the router with CORS applied to every route.
pub fn router(state: AppState, cors: CorsPolicy) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route(LEGACY_PREDICT_ROUTE, post(predict))
        .route("/health", get(health))
        .route("/model", get(model_summary))
        .with_state(state)
        .layer(middleware::from_fn(move |req, next| {
            let policy = cors.clone();
            cors_middleware(policy, req, next)
        }))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(settings: &ServerSettings, store: &ModelStore) -> Result<(), ServeError> {
    let addr = settings.bind_addr()?;
    let app = router(
        AppState::new(store, settings.max_body_bytes),
        CorsPolicy::new(settings.allowed_origins.clone()),
    );
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    info!(
        addr = %addr,
        model_id = %store.current().model_id,
        "Prediction service listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Prediction service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn predict(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PredictionResult>, ApiError> {
    let body = read_body(request, state.max_body_bytes).await?;
    let value: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::Malformed(format!("Malformed JSON body: {err}")))?;
    let prediction = inference::predict_value(&state.model, &value)?;
    Ok(Json(prediction.result()))
}

async fn read_body(request: Request, limit: usize) -> Result<Bytes, ApiError> {
    to_bytes(request.into_body(), limit)
        .await
        .map_err(|err| body_error(err, limit))
}

/// Only the length limit is a 413; a truncated or aborted body is a client error.
fn body_error(err: axum::Error, limit: usize) -> ApiError {
    let source = err.into_inner();
    if source.is::<LengthLimitError>() {
        ApiError::PayloadTooLarge { limit }
    } else {
        warn!("Failed to read request body: {source}");
        ApiError::Malformed(format!("Failed to read request body: {source}"))
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "model_id": state.model.model_id }))
}

async fn model_summary(State(state): State<AppState>) -> Json<ModelSummary> {
    Json(state.model.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[tokio::test]
    async fn body_over_the_limit_is_too_large() {
        let request = Request::new(Body::from(vec![b'x'; 64]));
        let err = read_body(request, 16).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { limit: 16 }));
    }

    #[test]
    fn aborted_body_is_malformed() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        match body_error(err, 16) {
            ApiError::Malformed(message) => assert!(message.contains("connection reset")),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }
}
