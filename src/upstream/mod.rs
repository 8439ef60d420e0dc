//! The language-model call.
//!
//! The core treats completion as an opaque async function: given a prompt,
//! return text or fail.  [`Completion`] is the seam; [`gateway`] holds the
//! HTTP implementation used in production and tests substitute their own.

use thiserror::Error;

use crate::prompt::Prompt;

pub mod gateway;

pub use self::gateway::{GatewayClient, GatewayDefinition};

/// Failure of the upstream call.  Variants map to distinct user-facing
/// messages; the detail strings are for logs only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream credits exhausted")]
    QuotaExhausted,
    #[error("upstream rate limited the request")]
    RateLimited,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// Text returned when the upstream reply carries no message content.
pub const EMPTY_COMPLETION: &str = "Unable to generate response";

#[async_trait::async_trait]
pub trait Completion: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, UpstreamError>;
}
