//! Selection strategy abstraction
//!
//! Each strategy picks one credential from a candidate set. Strategy choice is
//! made once at construction (`build_selector`); request handling only sees
//! `Arc<dyn Selector>`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::Auth;
use crate::concurrency::ConcurrencyAwareSelector;
use crate::error::Result;
use crate::fill_first::FillFirstSelector;
use crate::round_robin::RoundRobinSelector;

/// Per-request options passed through to the selector.
///
/// No current strategy inspects them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickOptions {
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Picks one usable credential for a (provider, model) request.
///
/// `pick` never blocks: it returns a credential or an error immediately.
pub trait Selector: Send + Sync {
    /// Strategy identifier for logging and metrics.
    fn name(&self) -> &'static str;

    /// Choose a credential from `auths` for `provider`/`model`.
    fn pick(
        &self,
        provider: &str,
        model: &str,
        options: &PickOptions,
        auths: &[Arc<Auth>],
    ) -> Result<Arc<Auth>>;

    /// Return capacity taken by a successful `pick`. Only strategies that
    /// track in-flight requests do anything here.
    fn release(&self, _auth_id: &str) {}
}

/// Configurable selection strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    FillFirst,
    ConcurrencyAware,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::FillFirst => "fill-first",
            Strategy::ConcurrencyAware => "concurrency-aware",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round-robin" | "roundrobin" | "rr" => Ok(Strategy::RoundRobin),
            "fill-first" | "fillfirst" | "ff" => Ok(Strategy::FillFirst),
            "concurrency-aware" | "concurrency" => Ok(Strategy::ConcurrencyAware),
            other => Err(format!("unknown selection strategy: {other}")),
        }
    }
}

/// Construct the selector for `strategy`.
///
/// `max_concurrent` only applies to `ConcurrencyAware`.
pub fn build_selector(strategy: Strategy, max_concurrent: i64) -> Arc<dyn Selector> {
    match strategy {
        Strategy::RoundRobin => Arc::new(RoundRobinSelector::new()),
        Strategy::FillFirst => Arc::new(FillFirstSelector),
        Strategy::ConcurrencyAware => Arc::new(ConcurrencyAwareSelector::new(max_concurrent)),
    }
}

/// Count a pick outcome per strategy.
pub(crate) fn record_pick<T>(strategy: &'static str, outcome: &Result<T>) {
    match outcome {
        Ok(_) => metrics::counter!("auth_selector_picks_total", "strategy" => strategy).increment(1),
        Err(e) => metrics::counter!(
            "auth_selector_pick_errors_total",
            "strategy" => strategy,
            "code" => e.code()
        )
        .increment(1),
    }
}
