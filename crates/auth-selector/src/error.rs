//! Error types for credential selection

use crate::cooldown::CooldownError;

/// Errors from `Selector::pick` and the availability filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The candidate set was empty.
    #[error("no auth candidates")]
    AuthNotFound,

    /// Every candidate is blocked and at least one is not a quota cooldown.
    #[error("no auth available")]
    AuthUnavailable,

    /// Every candidate is cooling down, or saturated.
    #[error("{0}")]
    ModelCooldown(CooldownError),
}

impl Error {
    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuthNotFound => "auth_not_found",
            Error::AuthUnavailable => "auth_unavailable",
            Error::ModelCooldown(_) => crate::cooldown::COOLDOWN_CODE,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Error::AuthNotFound => "no auth candidates".to_string(),
            Error::AuthUnavailable => "no auth available".to_string(),
            Error::ModelCooldown(e) => e.message(),
        }
    }

    /// HTTP status the dispatch layer should surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ModelCooldown(e) => e.status_code(),
            _ => 500,
        }
    }

    /// JSON response body.
    pub fn body(&self) -> String {
        match self {
            Error::ModelCooldown(e) => e.body(),
            _ => serde_json::json!({
                "error": {
                    "code": self.code(),
                    "message": self.message(),
                }
            })
            .to_string(),
        }
    }

    /// The structured cooldown details, if this is a cooldown.
    pub fn cooldown(&self) -> Option<&CooldownError> {
        match self {
            Error::ModelCooldown(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CooldownError> for Error {
    fn from(e: CooldownError) -> Self {
        Error::ModelCooldown(e)
    }
}

/// Result alias for selection operations.
pub type Result<T> = std::result::Result<T, Error>;
