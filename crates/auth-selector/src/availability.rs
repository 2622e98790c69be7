//! Credential availability filter
//!
//! Decides which candidates may serve a (provider, model) request right now.
//! Blocked candidates are classified so that a fully cooled-down set can be
//! reported with a concrete retry delay instead of a generic failure.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::auth::{Auth, AuthStatus, QuotaState};
use crate::cooldown::CooldownError;
use crate::error::{Error, Result};

/// Why a candidate was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Quota exceeded with a known recovery time.
    Cooldown,
    Disabled,
    Other,
}

/// A blocked candidate and, when known, when it may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub reason: BlockReason,
    pub next_retry: Option<SystemTime>,
}

impl Block {
    fn new(reason: BlockReason) -> Self {
        Self {
            reason,
            next_retry: None,
        }
    }
}

/// Classify one candidate for `model` at `now`. `None` means usable.
///
/// A per-model entry for `model` overrides the credential-wide state. A model
/// with no entry is unrestricted. An empty `model` checks the credential-wide
/// cooldown instead.
pub fn block_for_model(auth: Option<&Auth>, model: &str, now: SystemTime) -> Option<Block> {
    let auth = match auth {
        Some(a) => a,
        None => return Some(Block::new(BlockReason::Other)),
    };
    if auth.disabled || auth.status == AuthStatus::Disabled {
        return Some(Block::new(BlockReason::Disabled));
    }

    if !model.is_empty() {
        let state = auth.model_states.get(model)?;
        if state.status == AuthStatus::Disabled {
            return Some(Block::new(BlockReason::Disabled));
        }
        if state.unavailable {
            // unset retry time means retry immediately
            let retry_after = state.next_retry_after?;
            return cooldown_block(retry_after, &state.quota, now);
        }
        return None;
    }

    if auth.unavailable {
        if let Some(retry_after) = auth.next_retry_after {
            return cooldown_block(retry_after, &auth.quota, now);
        }
    }
    None
}

/// Blocked until `retry_after` if it is still ahead, preferring the quota
/// recovery time when that is also ahead.
fn cooldown_block(retry_after: SystemTime, quota: &QuotaState, now: SystemTime) -> Option<Block> {
    if retry_after <= now {
        return None;
    }
    let mut next = retry_after;
    if let Some(recover_at) = quota.next_recover_at.filter(|t| *t > now) {
        next = recover_at;
    }
    if next < now {
        next = now;
    }
    let reason = if quota.exceeded {
        BlockReason::Cooldown
    } else {
        BlockReason::Other
    };
    Some(Block {
        reason,
        next_retry: Some(next),
    })
}

/// Usable candidates plus what was learned about the blocked ones.
struct Partition {
    available: Vec<Arc<Auth>>,
    cooldown_count: usize,
    earliest: Option<SystemTime>,
}

fn collect_available(auths: &[Arc<Auth>], model: &str, now: SystemTime) -> Partition {
    let mut partition = Partition {
        available: Vec::with_capacity(auths.len()),
        cooldown_count: 0,
        earliest: None,
    };
    for auth in auths {
        let block = match block_for_model(Some(auth.as_ref()), model, now) {
            None => {
                partition.available.push(Arc::clone(auth));
                continue;
            }
            Some(b) => b,
        };
        if block.reason == BlockReason::Cooldown {
            partition.cooldown_count += 1;
            if let Some(next) = block.next_retry {
                if partition.earliest.is_none_or(|e| next < e) {
                    partition.earliest = Some(next);
                }
            }
        }
    }
    partition.available.sort_by(|a, b| a.id.cmp(&b.id));
    partition
}

/// Candidates eligible to serve `model` at `now`, sorted by ID.
///
/// Errors:
/// - `AuthNotFound` for an empty candidate set
/// - `ModelCooldown` when every candidate is in quota cooldown, carrying the
///   delay until the earliest one recovers
/// - `AuthUnavailable` for any other fully-blocked mixture
pub fn available_auths(
    auths: &[Arc<Auth>],
    provider: &str,
    model: &str,
    now: SystemTime,
) -> Result<Vec<Arc<Auth>>> {
    if auths.is_empty() {
        return Err(Error::AuthNotFound);
    }

    let partition = collect_available(auths, model, now);
    if !partition.available.is_empty() {
        return Ok(partition.available);
    }

    debug!(
        provider,
        model,
        candidates = auths.len(),
        cooling_down = partition.cooldown_count,
        "no available auth"
    );

    match partition.earliest {
        Some(earliest) if partition.cooldown_count == auths.len() => {
            let reset_in = earliest.duration_since(now).unwrap_or_default();
            Err(CooldownError::new(model, provider, reset_in).into())
        }
        _ => Err(Error::AuthUnavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ModelState;
    use std::time::Duration;

    const MODEL: &str = "gemini-2.5-pro";

    fn now() -> SystemTime {
        SystemTime::now()
    }

    fn cooling(id: &str, now: SystemTime, retry_in: Duration) -> Arc<Auth> {
        let mut auth = Auth::new(id, "gemini");
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                unavailable: true,
                next_retry_after: Some(now + retry_in),
                quota: QuotaState {
                    exceeded: true,
                    ..QuotaState::default()
                },
                ..ModelState::default()
            },
        );
        Arc::new(auth)
    }

    #[test]
    fn missing_auth_is_blocked_other() {
        let block = block_for_model(None, MODEL, now()).unwrap();
        assert_eq!(block.reason, BlockReason::Other);
        assert!(block.next_retry.is_none());
    }

    #[test]
    fn disabled_flag_blocks_regardless_of_model() {
        let mut auth = Auth::new("a", "gemini");
        auth.disabled = true;
        for model in ["", MODEL, "other-model"] {
            let block = block_for_model(Some(&auth), model, now()).unwrap();
            assert_eq!(block.reason, BlockReason::Disabled, "model {model:?}");
        }
    }

    #[test]
    fn disabled_status_blocks_regardless_of_model() {
        let mut auth = Auth::new("a", "gemini");
        auth.status = AuthStatus::Disabled;
        let block = block_for_model(Some(&auth), MODEL, now()).unwrap();
        assert_eq!(block.reason, BlockReason::Disabled);
    }

    #[test]
    fn per_model_disabled_status_blocks_only_that_model() {
        let mut auth = Auth::new("a", "gemini");
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                status: AuthStatus::Disabled,
                ..ModelState::default()
            },
        );
        let t = now();
        assert_eq!(
            block_for_model(Some(&auth), MODEL, t).unwrap().reason,
            BlockReason::Disabled
        );
        assert!(block_for_model(Some(&auth), "other-model", t).is_none());
    }

    #[test]
    fn model_without_entry_is_never_blocked_by_model_state() {
        let t = now();
        let mut auth = Auth::new("a", "gemini");
        // credential-wide cooldown does not apply when a model is named
        auth.unavailable = true;
        auth.next_retry_after = Some(t + Duration::from_secs(600));
        auth.quota.exceeded = true;

        assert!(block_for_model(Some(&auth), MODEL, t).is_none());
    }

    #[test]
    fn per_model_unavailable_without_retry_time_is_available() {
        let mut auth = Auth::new("a", "gemini");
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                unavailable: true,
                ..ModelState::default()
            },
        );
        assert!(block_for_model(Some(&auth), MODEL, now()).is_none());
    }

    #[test]
    fn per_model_retry_in_past_is_available() {
        let t = now();
        let auth = cooling("a", t - Duration::from_secs(120), Duration::from_secs(60));
        assert!(block_for_model(Some(auth.as_ref()), MODEL, t).is_none());
    }

    #[test]
    fn per_model_cooldown_prefers_later_quota_recovery() {
        let t = now();
        let mut auth = Auth::new("a", "gemini");
        let recover_at = t + Duration::from_secs(300);
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                unavailable: true,
                next_retry_after: Some(t + Duration::from_secs(30)),
                quota: QuotaState {
                    exceeded: true,
                    reason: Some("quota".into()),
                    next_recover_at: Some(recover_at),
                },
                ..ModelState::default()
            },
        );

        let block = block_for_model(Some(&auth), MODEL, t).unwrap();
        assert_eq!(block.reason, BlockReason::Cooldown);
        assert_eq!(block.next_retry, Some(recover_at));
    }

    #[test]
    fn past_quota_recovery_is_ignored() {
        let t = now();
        let mut auth = Auth::new("a", "gemini");
        let retry_after = t + Duration::from_secs(30);
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                unavailable: true,
                next_retry_after: Some(retry_after),
                quota: QuotaState {
                    exceeded: true,
                    next_recover_at: Some(t - Duration::from_secs(5)),
                    ..QuotaState::default()
                },
                ..ModelState::default()
            },
        );

        let block = block_for_model(Some(&auth), MODEL, t).unwrap();
        assert_eq!(block.next_retry, Some(retry_after));
    }

    #[test]
    fn unavailable_without_quota_exceeded_is_other() {
        let t = now();
        let mut auth = Auth::new("a", "gemini");
        auth.model_states.insert(
            MODEL.into(),
            ModelState {
                unavailable: true,
                next_retry_after: Some(t + Duration::from_secs(30)),
                ..ModelState::default()
            },
        );

        let block = block_for_model(Some(&auth), MODEL, t).unwrap();
        assert_eq!(block.reason, BlockReason::Other);
        assert!(block.next_retry.is_some());
    }

    #[test]
    fn global_cooldown_applies_without_model() {
        let t = now();
        let mut auth = Auth::new("a", "gemini");
        auth.unavailable = true;
        auth.next_retry_after = Some(t + Duration::from_secs(60));
        auth.quota.exceeded = true;
        auth.quota.next_recover_at = Some(t + Duration::from_secs(120));

        let block = block_for_model(Some(&auth), "", t).unwrap();
        assert_eq!(block.reason, BlockReason::Cooldown);
        assert_eq!(block.next_retry, Some(t + Duration::from_secs(120)));
    }

    #[test]
    fn global_unavailable_without_retry_time_is_available() {
        let mut auth = Auth::new("a", "gemini");
        auth.unavailable = true;
        assert!(block_for_model(Some(&auth), "", now()).is_none());
    }

    #[test]
    fn empty_candidates_is_not_found() {
        let err = available_auths(&[], "gemini", MODEL, now()).unwrap_err();
        assert_eq!(err, Error::AuthNotFound);
    }

    #[test]
    fn available_sorted_by_id() {
        let auths = vec![
            Arc::new(Auth::new("c", "gemini")),
            Arc::new(Auth::new("a", "gemini")),
            Arc::new(Auth::new("b", "gemini")),
        ];
        let available = available_auths(&auths, "gemini", MODEL, now()).unwrap();
        let ids: Vec<&str> = available.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn blocked_candidates_are_excluded() {
        let t = now();
        let mut disabled = Auth::new("a", "gemini");
        disabled.disabled = true;
        let auths = vec![
            Arc::new(disabled),
            cooling("b", t, Duration::from_secs(60)),
            Arc::new(Auth::new("c", "gemini")),
        ];
        let available = available_auths(&auths, "gemini", MODEL, t).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, "c");
    }

    #[test]
    fn all_cooling_reports_earliest_recovery() {
        let t = now();
        let auths = vec![
            cooling("a", t, Duration::from_secs(300)),
            cooling("b", t, Duration::from_secs(45)),
            cooling("c", t, Duration::from_secs(120)),
        ];

        let err = available_auths(&auths, "gemini", MODEL, t).unwrap_err();
        let cooldown = err.cooldown().expect("cooldown error");
        assert_eq!(cooldown.reset_in(), Duration::from_secs(45));
        assert_eq!(cooldown.model(), MODEL);
        assert_eq!(cooldown.provider(), "gemini");
    }

    #[test]
    fn mixed_block_reasons_is_unavailable() {
        let t = now();
        let mut disabled = Auth::new("b", "gemini");
        disabled.disabled = true;
        let auths = vec![cooling("a", t, Duration::from_secs(60)), Arc::new(disabled)];

        let err = available_auths(&auths, "gemini", MODEL, t).unwrap_err();
        assert_eq!(err, Error::AuthUnavailable);
    }

    #[test]
    fn all_disabled_is_unavailable() {
        let mut a = Auth::new("a", "gemini");
        a.disabled = true;
        let mut b = Auth::new("b", "gemini");
        b.status = AuthStatus::Disabled;

        let err =
            available_auths(&[Arc::new(a), Arc::new(b)], "gemini", MODEL, now()).unwrap_err();
        assert_eq!(err, Error::AuthUnavailable);
    }
}
