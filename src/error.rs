use crate::metrics::REJECTIONS;
use crate::store::StoreError;
use crate::validator::ValidationError;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

// Everything the signup endpoint can answer with besides 201.
// The Display text is what the client sees.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid email address")]
    Validation(#[from] ValidationError),

    #[error("This email is already on the waitlist")]
    Duplicate,

    #[error("Too many requests. Please try again later.")]
    RateLimited { retry_after: Duration },

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "invalid_email",
            ApiError::Duplicate => "duplicate",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Duplicate,
            StoreError::Unavailable(reason) => ApiError::Internal(reason),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        REJECTIONS.with_label_values(&[self.reason()]).inc();

        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));

        match self {
            ApiError::RateLimited { retry_after } => {
                // round up so clients never retry early
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
            }
            ApiError::Internal(reason) => {
                error!(%reason, "Error processing waitlist submission");
                (status, body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
