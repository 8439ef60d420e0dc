//! Request-level failure taxonomy and its HTTP mapping.
//!
//! Every failure is recovered at the request boundary and turned into the
//! `{ "success": false, "error": ... }` envelope.  The `error` string is the
//! display-safe [`AssistError::public_message`]; internal detail (upstream
//! status bodies, raw model replies) only ever reaches the logs.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repair::ParseError;
use crate::upstream::UpstreamError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("client exceeded request quota")]
    RateLimited { retry_after_secs: u64 },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("upstream credential not configured")]
    Configuration,
    #[error("request body exceeded {limit:?} bytes")]
    BodyTooLarge { limit: Option<usize> },
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Failure envelope returned to callers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AssistError {
    pub fn status(&self) -> StatusCode {
        match self {
            AssistError::Validation(_) | AssistError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AssistError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AssistError::Upstream(UpstreamError::QuotaExhausted) => StatusCode::PAYMENT_REQUIRED,
            AssistError::Upstream(UpstreamError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            AssistError::Upstream(UpstreamError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AssistError::Parse(_) => StatusCode::BAD_GATEWAY,
            AssistError::Configuration => StatusCode::SERVICE_UNAVAILABLE,
            AssistError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Message safe to show an end user.
    pub fn public_message(&self) -> String {
        match self {
            AssistError::Validation(err) => err.to_string(),
            AssistError::RateLimited { .. } => {
                "Too many requests. Please wait a moment before trying again.".to_string()
            }
            AssistError::Upstream(UpstreamError::QuotaExhausted) => {
                "AI service credits exhausted. Please contact support.".to_string()
            }
            AssistError::Upstream(UpstreamError::RateLimited) => {
                "Rate limit exceeded. Please try again in a moment.".to_string()
            }
            AssistError::Upstream(UpstreamError::Unavailable(_)) => {
                "AI service temporarily unavailable".to_string()
            }
            AssistError::Parse(_) => "Failed to parse recommendations. Please try again.".to_string(),
            AssistError::Configuration => "Service unavailable".to_string(),
            AssistError::BodyTooLarge { limit: Some(limit) } => {
                format!("Request too large (body exceeded limit {} bytes)", limit)
            }
            AssistError::BodyTooLarge { limit: None } => "Request too large".to_string(),
            AssistError::MalformedBody(_) => "Invalid request body".to_string(),
        }
    }

    /// Label used for the `reason` field in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AssistError::Validation(_) => "validation",
            AssistError::RateLimited { .. } => "rate_limited",
            AssistError::Upstream(_) => "upstream",
            AssistError::Parse(_) => "parse",
            AssistError::Configuration => "configuration",
            AssistError::BodyTooLarge { .. } => "body_too_large",
            AssistError::MalformedBody(_) => "malformed_body",
        }
    }
}

impl IntoResponse for AssistError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            success: false,
            error: self.public_message(),
        });
        let mut response = (status, body).into_response();
        if let AssistError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
