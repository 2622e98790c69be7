//! Credential records as seen by the selector
//!
//! An `Auth` is owned and mutated by the external credential store. The
//! selector only reads it. Timestamps are `Option<SystemTime>`; `None` is the
//! "unset" time and is never considered to be in the future.
//!
//! On disk and over the wire, timestamps are unix epoch milliseconds.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the credential store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Unknown,
    #[default]
    Active,
    Pending,
    Refreshing,
    Error,
    Disabled,
}

/// Quota exhaustion details reported by the upstream provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    #[serde(default)]
    pub exceeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the provider says the quota window resets.
    #[serde(
        default,
        with = "epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_recover_at: Option<SystemTime>,
}

/// Availability of a credential for one specific model.
///
/// When present for the requested model, it fully overrides the
/// credential-wide fields on `Auth`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default)]
    pub status: AuthStatus,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(
        default,
        with = "epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_retry_after: Option<SystemTime>,
    #[serde(default)]
    pub quota: QuotaState,
}

/// A credential usable to call a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub status: AuthStatus,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(
        default,
        with = "epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_retry_after: Option<SystemTime>,
    #[serde(default)]
    pub quota: QuotaState,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub model_states: HashMap<String, ModelState>,
}

impl Auth {
    /// An active credential with no availability restrictions.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }
}

/// Serde adapter for `Option<SystemTime>` as unix epoch milliseconds.
pub(crate) mod epoch_millis {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => {
                let millis = t
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // 0 is how some stores write "unset"
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis
            .filter(|m| *m > 0)
            .map(|m| UNIX_EPOCH + Duration::from_millis(m)))
    }
}
