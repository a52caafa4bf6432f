//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::inference::PredictError;
use crate::normalize::NormalizeError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Client input errors
    InvalidInput(NormalizeError),
    BadRequest(String),

    // Bundle/normalizer contract or model runtime faults
    Prediction(PredictError),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Prediction(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, field) = match &self {
            AppError::InvalidInput(err) => (err.to_string(), Some(err.field())),
            AppError::BadRequest(msg) => (msg.clone(), None),
            AppError::Prediction(PredictError::FeatureOrderMismatch { detail }) => {
                tracing::error!("Feature contract mismatch: {}", detail);
                ("Model artifacts do not match the input contract".to_string(), None)
            }
            AppError::Prediction(PredictError::Inference(err)) => {
                tracing::error!("Inference error: {}", err);
                ("Inference failed".to_string(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });
        if let Some(field) = field {
            body["field"] = json!(field);
        }

        (status, Json(body)).into_response()
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        AppError::InvalidInput(err)
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::Prediction(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("prediction task failed: {}", err))
    }
}
