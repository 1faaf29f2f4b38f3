//! API Error Responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use synapse_payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Errors returned to checkout callers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidArgument(String),

    /// The source error is logged, never serialized
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: PaymentError,
    },
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthenticated("You must be logged in to make a purchase.".into())
    }

    pub fn invalid_plan() -> Self {
        ApiError::InvalidArgument("Invalid plan specified.".into())
    }

    pub fn internal(source: PaymentError) -> Self {
        ApiError::Internal {
            message: source.user_message().to_string(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::InvalidArgument(_) => "invalid-argument",
            ApiError::Internal { .. } => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().into(),
        };
        (self.status(), Json(body)).into_response()
    }
}
