//! Per-client fixed-window rate limiting.
//!
//! Each client identifier owns a [`ClientWindow`].  The first request after
//! the window expires resets it to a count of one; later requests in the
//! same window increment the count until `max_requests` is reached.  A burst
//! straddling a window boundary can therefore see up to twice the nominal
//! rate.
//!
//! The check-and-increment runs under the DashMap shard lock for the key, so
//! concurrent requests from the same client never lose an update.  The map
//! is bounded: a new client arriving at a full map first triggers a sweep of
//! expired windows and, if that frees nothing, eviction of the window that
//! expires soonest.

use ahash::RandomState;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 10;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default bound on tracked client identifiers.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindow {
    pub count: u32,
    pub reset_at: Instant,
}

pub struct RateLimiter {
    windows: DashMap<String, ClientWindow, RandomState>,
    max_requests: u32,
    window: Duration,
    max_clients: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DEFAULT_MAX_CLIENTS)
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            windows: DashMap::with_hasher(RandomState::new()),
            max_requests,
            window,
            max_clients: max_clients.max(1),
        }
    }

    /// Record a request from `client_id` at `now`.  Returns false when the
    /// client has exhausted its quota for the current window; a rejected
    /// request does not touch the stored window.
    pub fn admit(&self, client_id: &str, now: Instant) -> bool {
        if !self.windows.contains_key(client_id) && self.windows.len() >= self.max_clients {
            self.make_room(now);
        }
        let mut entry = self
            .windows
            .entry(client_id.to_string())
            .or_insert(ClientWindow {
                count: 0,
                reset_at: now,
            });
        let window = entry.value_mut();
        if now >= window.reset_at {
            *window = ClientWindow {
                count: 1,
                reset_at: now + self.window,
            };
            return true;
        }
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }

    pub fn admit_now(&self, client_id: &str) -> bool {
        self.admit(client_id, Instant::now())
    }

    /// Snapshot of the stored window for `client_id`.
    pub fn window_for(&self, client_id: &str) -> Option<ClientWindow> {
        self.windows.get(client_id).map(|w| *w.value())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn make_room(&self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        let swept = before.saturating_sub(self.windows.len());
        if self.windows.len() < self.max_clients {
            tracing::debug!(swept, "rate limiter swept expired windows");
            return;
        }
        let oldest = self
            .windows
            .iter()
            .min_by_key(|e| e.value().reset_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.windows.remove(&key);
            tracing::debug!(
                max_clients = self.max_clients,
                "rate limiter full, evicted soonest-expiring window"
            );
        }
    }
}
