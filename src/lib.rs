//! Core library for the career-ai service.  This module wires the request
//! pipeline (rate limit, validation, prompt construction, upstream call and
//! reply repair) into axum handlers and holds the shared application state.

mod config;
pub mod error;
pub mod metrics;
pub mod prompt;
pub mod rate_limit;
pub mod recommendations;
pub mod render;
pub mod repair;
pub mod sanitize;
pub mod upstream;
pub mod util;
pub mod validate;

pub use config::{AppConfig, RateLimitConfig};
pub use error::{AssistError, ErrorResponse};
pub use prompt::Prompt;
pub use recommendations::RecommendationsDocument;
pub use upstream::{Completion, UpstreamError};
pub use validate::{RequestKind, ValidationError};

use axum::extract::{
    rejection::{BytesRejection, FailedToBufferBody, JsonRejection},
    ConnectInfo, DefaultBodyLimit, State,
};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::Metrics;
use crate::prompt::build_prompt;
use crate::rate_limit::RateLimiter;
use crate::recommendations::parse_recommendations;
use crate::upstream::GatewayClient;
use crate::util::client_identifier;
use crate::validate::{validate, ValidatedPayload};

static NULL: Value = Value::Null;

/// Body of `POST /career-ai`: a request type tag and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistRequest {
    pub kind: RequestKind,
    pub data: Value,
}

impl AssistRequest {
    /// Split a decoded body into its kind and data.  A missing `data` is
    /// passed on as `null` so the validator reports it.
    pub fn from_value(body: &Value) -> Result<Self, ValidationError> {
        let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;
        let kind = match obj.get("type") {
            None | Some(Value::Null) => return Err(ValidationError::Missing("type")),
            Some(Value::String(tag)) => tag.parse::<RequestKind>()?,
            Some(_) => return Err(ValidationError::WrongType("type")),
        };
        Ok(Self {
            kind,
            data: obj.get("data").unwrap_or(&NULL).clone(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssistResponse {
    pub success: bool,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecommendationsResponse {
    pub success: bool,
    pub data: RecommendationsDocument,
}

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    /// None when no upstream credential is configured.
    pub backend: Option<Arc<dyn Completion>>,
    pub max_tokens: u32,
    pub recommendations_max_tokens: u32,
    pub trust_proxy_headers: bool,
    /// Maximum accepted raw request body size in bytes (None => axum default)
    pub max_request_bytes: Option<usize>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    fn max_tokens_for(&self, kind: RequestKind) -> u32 {
        match kind {
            RequestKind::Recommendations => self.recommendations_max_tokens,
            _ => self.max_tokens,
        }
    }
}

/// Assemble state from parsed configuration and an optional completion
/// backend.
pub fn build_state(config: AppConfig, backend: Option<Arc<dyn Completion>>) -> AppState {
    let rl = &config.rate_limit;
    AppState {
        limiter: Arc::new(RateLimiter::new(rl.max_requests, rl.window, rl.max_clients)),
        backend,
        max_tokens: config.max_tokens,
        recommendations_max_tokens: config.recommendations_max_tokens,
        trust_proxy_headers: config.trust_proxy_headers,
        max_request_bytes: config.max_request_bytes,
        metrics: Arc::new(Metrics::new()),
    }
}

/// Build state from environment variables (see [`AppConfig::from_env`]).
/// The gateway client is only constructed when a credential is present.
pub fn build_state_from_env() -> Result<AppState, Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;
    let backend: Option<Arc<dyn Completion>> = match config.gateway.clone() {
        Some(def) => {
            tracing::info!(url = %def.url, model = %def.model, "upstream gateway configured");
            Some(Arc::new(GatewayClient::new(def)?))
        }
        None => {
            tracing::warn!("CAREER_AI_API_KEY not set; AI requests will be rejected");
            None
        }
    };
    Ok(build_state(config, backend))
}

/// Build the Axum router and attach handlers.
pub fn app(state: AppState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    let router = Router::new()
        .route("/career-ai", post(career_ai_handler))
        .route("/recommendations", post(recommendations_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler));

    let router = if let Some(limit) = max_request_bytes {
        router.layer(DefaultBodyLimit::max(limit))
    } else {
        router
    };

    router.with_state(state)
}

/// Charge the client's window.  Runs before any other work so a request
/// that later fails or times out has already been counted.
fn admit(state: &AppState, client: &str) -> Result<(), AssistError> {
    if state.limiter.admit(client, Instant::now()) {
        Ok(())
    } else {
        Err(AssistError::RateLimited {
            retry_after_secs: state.limiter.window().as_secs(),
        })
    }
}

fn backend(state: &AppState) -> Result<&Arc<dyn Completion>, AssistError> {
    state.backend.as_ref().ok_or(AssistError::Configuration)
}

fn decode_body(
    state: &AppState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Value, AssistError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| handle_json_rejection(state, rejection))
}

fn handle_json_rejection(state: &AppState, rejection: JsonRejection) -> AssistError {
    match rejection {
        JsonRejection::BytesRejection(BytesRejection::FailedToBufferBody(
            FailedToBufferBody::LengthLimitError(_),
        )) => {
            if let Some(limit) = state.max_request_bytes {
                tracing::warn!(limit, "request body exceeded configured limit");
            } else {
                tracing::warn!("request body exceeded default limit");
            }
            AssistError::BodyTooLarge {
                limit: state.max_request_bytes,
            }
        }
        other => AssistError::MalformedBody(other.body_text()),
    }
}

async fn complete(
    state: &AppState,
    backend: &Arc<dyn Completion>,
    payload: &ValidatedPayload,
) -> Result<String, AssistError> {
    let kind = payload.kind();
    state.metrics.record_kind(kind);
    let prompt = build_prompt(payload);
    tracing::debug!(
        %kind,
        backend = backend.name(),
        prompt_chars = prompt.user.chars().count(),
        "calling upstream"
    );
    Ok(backend.complete(&prompt, state.max_tokens_for(kind)).await?)
}

async fn career_ai(
    state: &AppState,
    client: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<String, AssistError> {
    admit(state, client)?;
    let backend = backend(state)?;
    let body = decode_body(state, body)?;
    let request = AssistRequest::from_value(&body)?;
    let payload = validate(request.kind, &request.data)?;
    complete(state, backend, &payload).await
}

async fn recommendations(
    state: &AppState,
    client: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<RecommendationsDocument, AssistError> {
    admit(state, client)?;
    let backend = backend(state)?;
    let body = decode_body(state, body)?;
    let payload = validate(RequestKind::Recommendations, &body)?;
    let reply = complete(state, backend, &payload).await?;
    Ok(parse_recommendations(&reply)?)
}

fn peer(connect: Option<ConnectInfo<SocketAddr>>) -> Option<SocketAddr> {
    connect.map(|ConnectInfo(addr)| addr)
}

async fn career_ai_handler(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    state.metrics.record_request();
    let client = client_identifier(&headers, peer(connect), state.trust_proxy_headers);
    let result = career_ai(&state, &client, body).await.map(|content| {
        Json(AssistResponse {
            success: true,
            content,
        })
        .into_response()
    });
    finish(&state, "/career-ai", &client, started, result)
}

async fn recommendations_handler(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    state.metrics.record_request();
    let client = client_identifier(&headers, peer(connect), state.trust_proxy_headers);
    let result = recommendations(&state, &client, body).await.map(|data| {
        Json(RecommendationsResponse {
            success: true,
            data,
        })
        .into_response()
    });
    finish(&state, "/recommendations", &client, started, result)
}

/// Record latency and failure counters, log the outcome and convert a
/// failure into its envelope.
fn finish(
    state: &AppState,
    route: &'static str,
    client: &str,
    started: Instant,
    result: Result<Response, AssistError>,
) -> Response {
    let elapsed = started.elapsed();
    state.metrics.observe_latency(elapsed);
    let elapsed_ms = elapsed.as_millis() as u64;
    let err = match result {
        Ok(response) => {
            tracing::info!(route, client, elapsed_ms, "request completed");
            return response;
        }
        Err(err) => err,
    };
    state.metrics.record_failure(&err);
    let status = err.status().as_u16();
    match &err {
        AssistError::Validation(_)
        | AssistError::MalformedBody(_)
        | AssistError::RateLimited { .. }
        | AssistError::BodyTooLarge { .. } => {
            tracing::info!(route, client, status, reason = err.reason(), error = %err, "request rejected");
        }
        AssistError::Parse(parse) => {
            tracing::warn!(
                route,
                client,
                status,
                reason = %parse.reason,
                raw_len = parse.raw.len(),
                "model reply could not be parsed"
            );
        }
        AssistError::Configuration => {
            tracing::error!(route, status, "upstream credential missing");
        }
        AssistError::Upstream(_) => {
            tracing::warn!(route, client, status, elapsed_ms, error = %err, "upstream call failed");
        }
    }
    err.into_response()
}

/// Health endpoint for container readiness / liveness checks.
async fn healthz_handler(State(state): State<AppState>) -> Response {
    let json = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "rateLimit": {
            "maxRequests": state.limiter.max_requests(),
            "windowSecs": state.limiter.window().as_secs(),
        },
        "upstreamConfigured": state.backend.is_some(),
    });
    (StatusCode::OK, Json(json)).into_response()
}

/// Prometheus-style metrics exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.metrics.render(&state.limiter);
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_requires_string_type() {
        assert_eq!(
            AssistRequest::from_value(&json!({"data": {}})).unwrap_err(),
            ValidationError::Missing("type")
        );
        assert_eq!(
            AssistRequest::from_value(&json!({"type": 7, "data": {}})).unwrap_err(),
            ValidationError::WrongType("type")
        );
        assert_eq!(
            AssistRequest::from_value(&json!({"type": "horoscope", "data": {}})).unwrap_err(),
            ValidationError::UnknownKind
        );
        assert_eq!(
            AssistRequest::from_value(&json!(["roadmap"])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }

    #[test]
    fn missing_data_is_passed_through_as_null() {
        let req = AssistRequest::from_value(&json!({"type": "roadmap"})).unwrap();
        assert_eq!(req.kind, RequestKind::Roadmap);
        assert_eq!(req.data, Value::Null);
    }

    #[test]
    fn recommendations_get_the_larger_budget() {
        let state = build_state(AppConfig::default(), None);
        assert_eq!(state.max_tokens_for(RequestKind::Roadmap), 1024);
        assert_eq!(state.max_tokens_for(RequestKind::Recommendations), 4096);
    }
}
