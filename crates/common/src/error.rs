//! Errors raised while loading configuration and the credential snapshot

use thiserror::Error;

/// Startup and persistence errors shared by the service crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid auth record: {0}")]
    InvalidRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_layer() {
        let err = Error::Config("max_connections must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_connections must be greater than 0"
        );

        let err = Error::InvalidRecord("auth id must not be empty".into());
        assert_eq!(err.to_string(), "invalid auth record: auth id must not be empty");
    }

    #[test]
    fn io_errors_convert() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn snapshot_json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn config_toml_errors_convert() {
        let parse: std::result::Result<toml::Table, _> = toml::from_str("strategy = ");
        let err: Error = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("config parse error:"), "got: {err}");
    }
}
