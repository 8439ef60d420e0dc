//! Request counters and the Prometheus text exposition served on `/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::AssistError;
use crate::rate_limit::RateLimiter;
use crate::validate::RequestKind;

/// Latency bucket upper bounds in milliseconds.  Upstream calls dominate, so
/// the range runs well into multi-second territory.
const LATENCY_BUCKETS_MS: [u64; 12] = [5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

pub struct Metrics {
    requests_total: AtomicU64,
    requests_by_kind: [AtomicU64; RequestKind::ALL.len()],
    rate_limited_total: AtomicU64,
    validation_failures_total: AtomicU64,
    upstream_errors_total: AtomicU64,
    parse_failures_total: AtomicU64,
    hist_counts: [AtomicU64; LATENCY_BUCKETS_MS.len()],
    hist_sum_ms: AtomicU64,
    hist_count: AtomicU64,
    started: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            rate_limited_total: AtomicU64::new(0),
            validation_failures_total: AtomicU64::new(0),
            upstream_errors_total: AtomicU64::new(0),
            parse_failures_total: AtomicU64::new(0),
            hist_counts: std::array::from_fn(|_| AtomicU64::new(0)),
            hist_sum_ms: AtomicU64::new(0),
            hist_count: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kind(&self, kind: RequestKind) {
        self.requests_by_kind[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed request under its category.
    pub fn record_failure(&self, err: &AssistError) {
        let counter = match err {
            AssistError::RateLimited { .. } => &self.rate_limited_total,
            AssistError::Validation(_) | AssistError::MalformedBody(_) => {
                &self.validation_failures_total
            }
            AssistError::Upstream(_) => &self.upstream_errors_total,
            AssistError::Parse(_) => &self.parse_failures_total,
            AssistError::Configuration | AssistError::BodyTooLarge { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, elapsed: Duration) {
        let ms = elapsed.as_millis() as u64;
        if let Some(idx) = LATENCY_BUCKETS_MS.iter().position(|ub| ms <= *ub) {
            self.hist_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.hist_sum_ms.fetch_add(ms, Ordering::Relaxed);
        self.hist_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.rate_limited_total.load(Ordering::Relaxed)
    }

    /// Prometheus text format.
    pub fn render(&self, limiter: &RateLimiter) -> String {
        let mut buf = String::new();
        writeln!(
            &mut buf,
            "# HELP career_ai_requests_total Total AI requests received\n# TYPE career_ai_requests_total counter"
        )
        .ok();
        writeln!(&mut buf, "career_ai_requests_total {}", self.requests_total()).ok();
        writeln!(
            &mut buf,
            "# HELP career_ai_requests_by_kind_total Validated requests per request type\n# TYPE career_ai_requests_by_kind_total counter"
        )
        .ok();
        for kind in RequestKind::ALL {
            writeln!(
                &mut buf,
                "career_ai_requests_by_kind_total{{kind=\"{}\"}} {}",
                kind,
                self.requests_by_kind[kind.index()].load(Ordering::Relaxed)
            )
            .ok();
        }
        let counters = [
            (
                "career_ai_rate_limited_total",
                "Requests rejected by the per-client rate limiter",
                &self.rate_limited_total,
            ),
            (
                "career_ai_validation_failures_total",
                "Requests rejected by structural validation",
                &self.validation_failures_total,
            ),
            (
                "career_ai_upstream_errors_total",
                "Failed upstream completion calls",
                &self.upstream_errors_total,
            ),
            (
                "career_ai_parse_failures_total",
                "Model replies that could not be repaired into JSON",
                &self.parse_failures_total,
            ),
        ];
        for (name, help, counter) in counters {
            writeln!(&mut buf, "# HELP {} {}\n# TYPE {} counter", name, help, name).ok();
            writeln!(&mut buf, "{} {}", name, counter.load(Ordering::Relaxed)).ok();
        }
        writeln!(
            &mut buf,
            "# HELP career_ai_tracked_clients Client windows held by the rate limiter\n# TYPE career_ai_tracked_clients gauge"
        )
        .ok();
        writeln!(&mut buf, "career_ai_tracked_clients {}", limiter.tracked_clients()).ok();

        writeln!(
            &mut buf,
            "# HELP career_ai_request_latency_ms Request latency histogram milliseconds\n# TYPE career_ai_request_latency_ms histogram"
        )
        .ok();
        let count = self.hist_count.load(Ordering::Relaxed);
        let mut cumulative: u64 = 0;
        for (i, ub) in LATENCY_BUCKETS_MS.iter().enumerate() {
            cumulative += self.hist_counts[i].load(Ordering::Relaxed);
            writeln!(
                &mut buf,
                "career_ai_request_latency_ms_bucket{{le=\"{}\"}} {}",
                ub, cumulative
            )
            .ok();
        }
        writeln!(
            &mut buf,
            "career_ai_request_latency_ms_bucket{{le=\"+Inf\"}} {}",
            count
        )
        .ok();
        writeln!(
            &mut buf,
            "career_ai_request_latency_ms_sum {}",
            self.hist_sum_ms.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(&mut buf, "career_ai_request_latency_ms_count {}", count).ok();

        writeln!(
            &mut buf,
            "# HELP career_ai_build_info Build information\n# TYPE career_ai_build_info gauge"
        )
        .ok();
        writeln!(
            &mut buf,
            "career_ai_build_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )
        .ok();
        writeln!(
            &mut buf,
            "# HELP career_ai_process_uptime_seconds Process uptime seconds\n# TYPE career_ai_process_uptime_seconds gauge"
        )
        .ok();
        writeln!(
            &mut buf,
            "career_ai_process_uptime_seconds {}",
            self.started.elapsed().as_secs_f64()
        )
        .ok();
        buf
    }
}
