//! Fill-first selection
//!
//! Always returns the lowest-ID available credential, so one account is used
//! until it is exhausted before the next is touched. This staggers
//! rolling-window usage caps across accounts instead of draining them all at
//! once.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::auth::Auth;
use crate::availability::available_auths;
use crate::error::Result;
use crate::selector::{PickOptions, Selector, record_pick};

/// Stateless deterministic selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FillFirstSelector;

impl Selector for FillFirstSelector {
    fn name(&self) -> &'static str {
        "fill-first"
    }

    fn pick(
        &self,
        provider: &str,
        model: &str,
        _options: &PickOptions,
        auths: &[Arc<Auth>],
    ) -> Result<Arc<Auth>> {
        let result = available_auths(auths, provider, model, SystemTime::now()).map(|available| {
            let first = Arc::clone(&available[0]);
            debug!(auth_id = %first.id, provider, model, "fill-first picked auth");
            first
        });
        record_pick(self.name(), &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ModelState;
    use crate::error::Error;
    use proptest::prelude::*;

    fn auths(ids: &[&str]) -> Vec<Arc<Auth>> {
        ids.iter().map(|id| Arc::new(Auth::new(*id, "gemini"))).collect()
    }

    #[test]
    fn picks_lowest_id_deterministically() {
        let selector = FillFirstSelector;
        let candidates = auths(&["b", "a", "c"]);
        for _ in 0..5 {
            let got = selector
                .pick("gemini", "", &PickOptions::default(), &candidates)
                .unwrap();
            assert_eq!(got.id, "a");
        }
    }

    #[test]
    fn moves_to_next_when_first_is_disabled() {
        let selector = FillFirstSelector;
        let mut a = Auth::new("a", "gemini");
        a.model_states.insert(
            "m".into(),
            ModelState {
                status: crate::auth::AuthStatus::Disabled,
                ..ModelState::default()
            },
        );
        let candidates = vec![Arc::new(a), Arc::new(Auth::new("b", "gemini"))];

        let got = selector
            .pick("gemini", "m", &PickOptions::default(), &candidates)
            .unwrap();
        assert_eq!(got.id, "b");
    }

    #[test]
    fn empty_candidates_is_not_found() {
        let err = FillFirstSelector
            .pick("gemini", "m", &PickOptions::default(), &[])
            .unwrap_err();
        assert_eq!(err, Error::AuthNotFound);
    }

    proptest! {
        #[test]
        fn always_returns_smallest_id(
            ids in proptest::collection::hash_set("[a-z0-9]{1,8}", 1..10),
            calls in 1usize..5,
        ) {
            let candidates: Vec<Arc<Auth>> = ids
                .iter()
                .map(|id| Arc::new(Auth::new(id.clone(), "gemini")))
                .collect();
            let smallest = ids.iter().min().unwrap().clone();

            for _ in 0..calls {
                let got = FillFirstSelector
                    .pick("gemini", "m", &PickOptions::default(), &candidates)
                    .unwrap();
                prop_assert_eq!(&got.id, &smallest);
            }
        }
    }
}
