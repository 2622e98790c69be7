//! Structured 429 error for exhausted credential sets
//!
//! Returned when every candidate is cooling down, and reused by the
//! concurrency-aware selector when every candidate is saturated, so HTTP
//! clients see one uniform rate-limit response for both cases.

use std::fmt;
use std::time::Duration;

/// HTTP status for a cooldown response (Too Many Requests).
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Error code carried in the JSON body.
pub const COOLDOWN_CODE: &str = "model_cooldown";

/// All credentials for a model are unusable until `reset_in` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownError {
    model: String,
    provider: String,
    reset_in: Duration,
}

impl CooldownError {
    pub fn new(model: impl Into<String>, provider: impl Into<String>, reset_in: Duration) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            reset_in,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Delay until the earliest credential becomes usable again.
    pub fn reset_in(&self) -> Duration {
        self.reset_in
    }

    pub fn status_code(&self) -> u16 {
        STATUS_TOO_MANY_REQUESTS
    }

    /// Whole seconds to wait, rounded up.
    pub fn reset_seconds(&self) -> u64 {
        let secs = self.reset_in.as_secs();
        if self.reset_in.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }

    /// Response headers: `Content-Type` and `Retry-After`.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "application/json".to_string()),
            ("Retry-After", self.reset_seconds().to_string()),
        ]
    }

    /// Human-readable message embedded in the body.
    pub fn message(&self) -> String {
        let model = if self.model.is_empty() {
            "requested model"
        } else {
            &self.model
        };
        let mut message = format!("All credentials for model {model} are cooling down");
        if !self.provider.is_empty() {
            message.push_str(" via provider ");
            message.push_str(&self.provider);
        }
        message
    }

    /// JSON response body.
    pub fn body(&self) -> String {
        let message = self.message();
        let mut error = serde_json::json!({
            "code": COOLDOWN_CODE,
            "message": message,
            "model": self.model,
            "reset_time": format_reset_time(display_duration(self.reset_in)),
            "reset_seconds": self.reset_seconds(),
        });
        if !self.provider.is_empty() {
            error["provider"] = serde_json::Value::String(self.provider.clone());
        }
        match serde_json::to_string(&serde_json::json!({ "error": error })) {
            Ok(body) => body,
            Err(_) => format!(r#"{{"error":{{"code":"{COOLDOWN_CODE}","message":"{message}"}}}}"#),
        }
    }
}

impl fmt::Display for CooldownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body())
    }
}

impl std::error::Error for CooldownError {}

/// Round to whole seconds, never showing a pending sub-second wait as zero.
fn display_duration(reset_in: Duration) -> Duration {
    if !reset_in.is_zero() && reset_in < Duration::from_secs(1) {
        return Duration::from_secs(1);
    }
    let mut secs = reset_in.as_secs();
    if reset_in.subsec_nanos() >= 500_000_000 {
        secs += 1;
    }
    Duration::from_secs(secs)
}

/// Format whole seconds as `0s`, `45s`, `2m5s`, `1h0m0s`.
fn format_reset_time(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
