//! Round-robin selection scoped by provider and model
//!
//! One cursor per `provider:model` key. Sequential picks over a stable
//! candidate set walk the ID-sorted available list in order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::debug;

use crate::auth::Auth;
use crate::availability::available_auths;
use crate::error::Result;
use crate::selector::{PickOptions, Selector, record_pick};

/// Cursors reset here, well below `i32::MAX`.
const CURSOR_WRAP: usize = 2_147_483_640;

/// Provider/model scoped round-robin selector.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    cursors: Mutex<HashMap<String, usize>>,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the cursor for `key` and advance it.
    fn next_index(&self, key: String) -> usize {
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = cursors.entry(key).or_insert(0);
        if *cursor >= CURSOR_WRAP {
            *cursor = 0;
        }
        let index = *cursor;
        *cursor += 1;
        index
    }
}

impl Selector for RoundRobinSelector {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn pick(
        &self,
        provider: &str,
        model: &str,
        _options: &PickOptions,
        auths: &[Arc<Auth>],
    ) -> Result<Arc<Auth>> {
        let result = available_auths(auths, provider, model, SystemTime::now()).map(|available| {
            let index = self.next_index(format!("{provider}:{model}"));
            let picked = Arc::clone(&available[index % available.len()]);
            debug!(
                auth_id = %picked.id,
                provider,
                model,
                index,
                available = available.len(),
                "round-robin picked auth"
            );
            picked
        });
        record_pick(self.name(), &result);
        result
    }
}
