//! Small helpers shared by the request path.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identifier used when no peer address or trusted proxy header is available.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Return the prefix of `text` holding at most `max_chars` characters.  Never
/// splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Derive the rate-limiter key for a request.  Forwarding headers are only
/// honoured when the deployment sits behind a proxy that sets them.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(addr) = real_ip {
            return addr.to_string();
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => ANONYMOUS_CLIENT.to_string(),
    }
}
