#[path = "common/mod.rs"]
mod common;

use career_ai::{build_state_from_env, AppConfig};
use common::EnvGuard;
use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::Duration;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[test]
fn rejects_invalid_numeric_env_values() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.set("CAREER_AI_RATE_LIMIT_WINDOW_SECS", "-5");
    let err = AppConfig::from_env().expect_err("expected invalid window to error");
    assert!(format!("{}", err).contains("CAREER_AI_RATE_LIMIT_WINDOW_SECS"));
}

#[test]
fn rejects_out_of_range_temperature() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.set("CAREER_AI_TEMPERATURE", "7.5");
    let err = AppConfig::from_env().expect_err("expected temperature bound to error");
    assert!(format!("{}", err).contains("CAREER_AI_TEMPERATURE"));
}

#[test]
fn state_without_credential_has_no_backend() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.remove("CAREER_AI_API_KEY");
    env.remove("LOVABLE_API_KEY");
    env.set("CAREER_AI_RATE_LIMIT_MAX", "25");
    env.set("CAREER_AI_RATE_LIMIT_WINDOW_SECS", "30");
    let state = build_state_from_env().unwrap();
    assert!(state.backend.is_none());
    assert_eq!(state.limiter.max_requests(), 25);
    assert_eq!(state.limiter.window(), Duration::from_secs(30));
}

#[test]
fn blank_credential_counts_as_missing() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let mut env = EnvGuard::new();
    env.set("CAREER_AI_API_KEY", "   ");
    env.remove("LOVABLE_API_KEY");
    let cfg = AppConfig::from_env().unwrap();
    assert!(cfg.gateway.is_none());
}
