use super::{Completion, UpstreamError, EMPTY_COMPLETION};
use crate::prompt::Prompt;

/// Connection settings for an OpenAI-compatible chat-completions gateway.
#[derive(Clone, Debug)]
pub struct GatewayDefinition {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_ms: u64,
}

pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

pub fn gateway_default_model() -> String {
    "google/gemini-3-flash-preview".to_string()
}
pub fn gateway_default_temperature() -> f64 {
    0.7
}
pub fn gateway_default_timeout() -> u64 {
    30_000
}

/// Posts prompts to the gateway and returns the first choice's content.
pub struct GatewayClient {
    def: GatewayDefinition,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(def: GatewayDefinition) -> Result<Self, reqwest::Error> {
        let timeout = std::time::Duration::from_millis(def.timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { def, client })
    }

    fn render_body(&self, prompt: &Prompt, max_tokens: u32) -> serde_json::Value {
        serde_json::json!({
            "model": self.def.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "stream": false,
            "temperature": self.def.temperature,
            "max_tokens": max_tokens,
        })
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_content(val: &serde_json::Value) -> String {
    val.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(EMPTY_COMPLETION)
        .to_string()
}

fn classify_status(status: reqwest::StatusCode) -> UpstreamError {
    match status.as_u16() {
        402 => UpstreamError::QuotaExhausted,
        429 => UpstreamError::RateLimited,
        code => UpstreamError::Unavailable(format!("status {}", code)),
    }
}

#[async_trait::async_trait]
impl Completion for GatewayClient {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, UpstreamError> {
        let body = self.render_body(prompt, max_tokens);
        let resp = self
            .client
            .post(&self.def.url)
            .bearer_auth(&self.def.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(kind = %prompt.kind, error = ?err, "gateway network error");
                UpstreamError::Unavailable("network error".into())
            })?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(
                kind = %prompt.kind,
                status = status.as_u16(),
                body = %detail,
                "gateway returned error status"
            );
            return Err(classify_status(status));
        }
        let json: serde_json::Value = resp.json().await.map_err(|err| {
            tracing::warn!(kind = %prompt.kind, error = ?err, "gateway response decode error");
            UpstreamError::Unavailable("decode error".into())
        })?;
        Ok(extract_content(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::RequestKind;
    use serde_json::json;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayDefinition {
            url: "http://example.com/v1/chat/completions".to_string(),
            api_key: "test-key".to_string(),
            model: gateway_default_model(),
            temperature: gateway_default_temperature(),
            timeout_ms: 500,
        })
        .unwrap()
    }

    #[test]
    fn body_carries_system_and_user_messages() {
        let prompt = Prompt {
            kind: RequestKind::Roadmap,
            system: "be helpful",
            user: "line1\n\"quoted\"".to_string(),
        };
        let body = client().render_body(&prompt, 1024);
        assert_eq!(body["model"], json!("google/gemini-3-flash-preview"));
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "be helpful"}));
        assert_eq!(body["messages"][1]["content"], json!("line1\n\"quoted\""));
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["max_tokens"], json!(1024));
    }

    #[test]
    fn content_falls_back_when_absent() {
        let ok = json!({"choices": [{"message": {"content": "Hello"}}]});
        assert_eq!(extract_content(&ok), "Hello");
        assert_eq!(extract_content(&json!({"choices": []})), EMPTY_COMPLETION);
        assert_eq!(
            extract_content(&json!({"choices": [{"message": {"content": ""}}]})),
            EMPTY_COMPLETION
        );
    }

    #[test]
    fn statuses_map_to_distinct_errors() {
        assert_eq!(
            classify_status(reqwest::StatusCode::PAYMENT_REQUIRED),
            UpstreamError::QuotaExhausted
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            UpstreamError::RateLimited
        );
        assert!(matches!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY),
            UpstreamError::Unavailable(_)
        ));
    }
}
