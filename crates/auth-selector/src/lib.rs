//! Credential selection and admission control for a multi-provider proxy
//!
//! Given a (provider, model) request and a set of candidate credentials, picks
//! exactly one usable credential. Credentials that are disabled or cooling
//! down are skipped; when every candidate is cooling down the caller gets a
//! structured 429 error with a retry delay.
//!
//! Selection flow:
//! 1. Caller passes candidates to `Selector::pick`
//! 2. `availability::available_auths` drops blocked candidates, sorted by ID
//! 3. The strategy breaks the tie (round-robin, fill-first, least-loaded)
//! 4. Concurrency-aware callers call `Selector::release` when the request ends
//!
//! Credential records are owned by an external store; this crate only reads
//! them. All selector state is in-memory and per-instance.

pub mod auth;
pub mod availability;
pub mod concurrency;
pub mod cooldown;
pub mod error;
pub mod fill_first;
pub mod round_robin;
pub mod selector;

pub use auth::{Auth, AuthStatus, ModelState, QuotaState};
pub use availability::{Block, BlockReason, available_auths, block_for_model};
pub use concurrency::ConcurrencyAwareSelector;
pub use cooldown::CooldownError;
pub use error::{Error, Result};
pub use fill_first::FillFirstSelector;
pub use round_robin::RoundRobinSelector;
pub use selector::{PickOptions, Selector, Strategy, build_selector};
