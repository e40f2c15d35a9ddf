//! Mapping of request failures onto JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::inference::PredictError;

/// Message returned for server-side faults; details stay in the logs.
pub const INTERNAL_MESSAGE: &str = "Prediction failed due to an internal model error";

#[derive(Debug)]
pub enum ApiError {
    /// Body was not valid JSON.
    Malformed(String),
    /// Body parsed but failed field validation.
    Invalid {
        message: String,
        fields: Vec<&'static str>,
    },
    PayloadTooLarge { limit: usize },
    Internal,
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(err) => ApiError::Invalid {
                message: err.to_string(),
                fields: err.fields(),
            },
            PredictError::SchemaMismatch(_) | PredictError::ModelOutput { .. } => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Malformed(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Invalid { message, fields } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "fields": fields }),
            ),
            ApiError::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": format!("Request body exceeds {limit} bytes") }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": INTERNAL_MESSAGE }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
