use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::rate_limit::{DEFAULT_MAX_CLIENTS, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use crate::upstream::gateway::{
    gateway_default_model, gateway_default_temperature, gateway_default_timeout,
    DEFAULT_GATEWAY_URL,
};
use crate::upstream::GatewayDefinition;

/// Token budget for prose replies.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Token budget for the recommendations document, which is considerably
/// longer than any prose reply.
pub const DEFAULT_RECOMMENDATIONS_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub max_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absent when no credential is configured; AI requests then fail with a
    /// configuration error instead of reaching the gateway.
    pub gateway: Option<GatewayDefinition>,
    pub max_tokens: u32,
    pub recommendations_max_tokens: u32,
    pub rate_limit: RateLimitConfig,
    pub trust_proxy_headers: bool,
    pub max_request_bytes: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            recommendations_max_tokens: DEFAULT_RECOMMENDATIONS_MAX_TOKENS,
            rate_limit: RateLimitConfig::default(),
            trust_proxy_headers: false,
            max_request_bytes: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = non_empty_var("CAREER_AI_API_KEY").or_else(|| non_empty_var("LOVABLE_API_KEY"));

        let temperature = parse_optional_f64("CAREER_AI_TEMPERATURE")?
            .unwrap_or_else(gateway_default_temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("CAREER_AI_TEMPERATURE must be between 0 and 2"));
        }
        let timeout_ms = parse_optional_u64("CAREER_AI_UPSTREAM_TIMEOUT_MS")?
            .unwrap_or_else(gateway_default_timeout);

        let gateway = api_key.map(|api_key| GatewayDefinition {
            url: non_empty_var("CAREER_AI_GATEWAY_URL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            api_key,
            model: non_empty_var("CAREER_AI_MODEL").unwrap_or_else(gateway_default_model),
            temperature,
            timeout_ms,
        });

        let max_tokens = parse_optional_u32("CAREER_AI_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
        let recommendations_max_tokens = parse_optional_u32("CAREER_AI_RECOMMENDATIONS_MAX_TOKENS")?
            .unwrap_or(DEFAULT_RECOMMENDATIONS_MAX_TOKENS);

        let max_requests =
            parse_optional_u32("CAREER_AI_RATE_LIMIT_MAX")?.unwrap_or(DEFAULT_MAX_REQUESTS);
        if max_requests == 0 {
            return Err(anyhow!("CAREER_AI_RATE_LIMIT_MAX must be at least 1"));
        }
        let window = parse_optional_u64("CAREER_AI_RATE_LIMIT_WINDOW_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WINDOW);
        if window.is_zero() {
            return Err(anyhow!("CAREER_AI_RATE_LIMIT_WINDOW_SECS must be at least 1"));
        }
        let max_clients = parse_optional_u64("CAREER_AI_RATE_LIMIT_MAX_CLIENTS")?
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_CLIENTS);

        let trust_proxy_headers =
            parse_bool_env("CAREER_AI_TRUST_PROXY_HEADERS")?.unwrap_or(false);
        let max_request_bytes =
            parse_optional_u64("CAREER_AI_MAX_REQUEST_BYTES")?.map(|v| v as usize);

        Ok(Self {
            gateway,
            max_tokens,
            recommendations_max_tokens,
            rate_limit: RateLimitConfig {
                max_requests,
                window,
                max_clients,
            },
            trust_proxy_headers,
            max_request_bytes,
        })
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_optional_u32(var: &str) -> Result<Option<u32>> {
    match parse_optional_u64(var)? {
        Some(v) => u32::try_from(v)
            .map(Some)
            .map_err(|_| anyhow!("{} is out of range", var)),
        None => Ok(None),
    }
}

fn parse_optional_f64(var: &str) -> Result<Option<f64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a number", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
