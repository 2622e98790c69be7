//! Concurrency-aware selection with per-credential in-flight caps
//!
//! Tracks active requests per credential and prefers the least-loaded one.
//! When every available credential is at its cap, `pick` fails immediately
//! with the same 429 cooldown error used for quota exhaustion; it never waits
//! for capacity. `wait_timeout` only populates that error's retry hint.
//!
//! Every successful `pick` must be paired with exactly one `release` once the
//! upstream request finishes, or the slot is lost for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::auth::Auth;
use crate::availability::available_auths;
use crate::cooldown::CooldownError;
use crate::error::Result;
use crate::selector::{PickOptions, Selector, record_pick};

/// Fallback per-credential cap when none (or a non-positive one) is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Retry hint reported when every credential is saturated.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Least-loaded selector with a fixed in-flight ceiling per credential.
#[derive(Debug)]
pub struct ConcurrencyAwareSelector {
    active: Mutex<HashMap<String, usize>>,
    max_concurrent: usize,
    wait_timeout: Duration,
}

impl ConcurrencyAwareSelector {
    /// `max_concurrent <= 0` falls back to `DEFAULT_MAX_CONCURRENT`.
    pub fn new(max_concurrent: i64) -> Self {
        let max_concurrent = if max_concurrent <= 0 {
            DEFAULT_MAX_CONCURRENT
        } else {
            max_concurrent as usize
        };
        Self {
            active: Mutex::new(HashMap::new()),
            max_concurrent,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// In-flight requests currently charged to `auth_id`.
    pub fn active_count(&self, auth_id: &str) -> usize {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.get(auth_id).copied().unwrap_or(0)
    }

    /// In-flight requests across all credentials.
    pub fn total_active(&self) -> usize {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.values().sum()
    }

    fn acquire(&self, provider: &str, model: &str, available: Vec<Arc<Auth>>) -> Result<Arc<Auth>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        let mut sorted = available;
        sorted.sort_by(|a, b| {
            let load_a = active.get(&a.id).copied().unwrap_or(0);
            let load_b = active.get(&b.id).copied().unwrap_or(0);
            load_a.cmp(&load_b).then_with(|| a.id.cmp(&b.id))
        });

        for auth in &sorted {
            let count = active.entry(auth.id.clone()).or_insert(0);
            if *count < self.max_concurrent {
                *count += 1;
                debug!(
                    auth_id = %auth.id,
                    provider,
                    model,
                    active = *count,
                    max_concurrent = self.max_concurrent,
                    available = sorted.len(),
                    "concurrency-aware picked auth"
                );
                return Ok(Arc::clone(auth));
            }
        }

        warn!(
            provider,
            model,
            available = sorted.len(),
            max_concurrent = self.max_concurrent,
            "all auths at concurrency limit"
        );
        Err(CooldownError::new(model, provider, self.wait_timeout).into())
    }
}

impl Default for ConcurrencyAwareSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT as i64)
    }
}

impl Selector for ConcurrencyAwareSelector {
    fn name(&self) -> &'static str {
        "concurrency-aware"
    }

    fn pick(
        &self,
        provider: &str,
        model: &str,
        _options: &PickOptions,
        auths: &[Arc<Auth>],
    ) -> Result<Arc<Auth>> {
        let result = available_auths(auths, provider, model, SystemTime::now())
            .and_then(|available| self.acquire(provider, model, available));
        record_pick(self.name(), &result);
        result
    }

    /// Free one slot on `auth_id`. Unknown ids are ignored; idle entries are dropped.
    fn release(&self, auth_id: &str) {
        if auth_id.is_empty() {
            return;
        }
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(count) = active.get_mut(auth_id) else {
            return;
        };
        *count = count.saturating_sub(1);
        debug!(auth_id, active = *count, "released auth");
        if *count == 0 {
            active.remove(auth_id);
        }
    }
}
