use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response};
use career_ai::{build_state, AppConfig, AppState, Completion, Prompt, UpstreamError};
use http_body_util::BodyExt;

/// Tracks environment variable mutations and restores originals on drop.
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

#[allow(dead_code)]
impl EnvGuard {
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    pub fn set_many(&mut self, entries: &[(&str, &str)]) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Completion backend returning a canned reply and recording what it saw.
pub struct FakeCompletion {
    reply: Result<String, UpstreamError>,
    calls: AtomicUsize,
    last_max_tokens: AtomicU32,
    last_prompt: Mutex<Option<Prompt>>,
}

#[allow(dead_code)]
impl FakeCompletion {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self::with_result(Ok(text.to_string())))
    }

    pub fn failing(err: UpstreamError) -> Arc<Self> {
        Arc::new(Self::with_result(Err(err)))
    }

    fn with_result(reply: Result<String, UpstreamError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_max_tokens: AtomicU32::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_max_tokens(&self) -> u32 {
        self.last_max_tokens.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Completion for FakeCompletion {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_max_tokens.store(max_tokens, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        self.reply.clone()
    }
}

/// State with default configuration around the given backend.
#[allow(dead_code)]
pub fn state_with(backend: Arc<FakeCompletion>) -> AppState {
    let backend: Arc<dyn Completion> = backend;
    build_state(AppConfig::default(), Some(backend))
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
