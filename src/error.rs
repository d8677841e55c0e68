//! Error types for folio

use thiserror::Error;

/// Result type alias for folio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed repository reference: {0}")]
    MalformedReference(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Outcome of a single failed GET
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Not found")]
    NotFound,

    #[error("Remote returned status {status}")]
    Remote { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Transport("Request timed out".to_string())
        } else if err.is_connect() {
            FetchError::Transport("Failed to connect".to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Durable store errors, surfaced to callers as-is
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Invalid owner key: {0:?}")]
    InvalidKey(String),

    #[error("Profile document belongs to {found:?}, not {expected:?}")]
    OwnerMismatch { expected: String, found: String },

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored profile is corrupt: {0}")]
    Decode(String),

    #[error("Failed to serialize profile: {0}")]
    Encode(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Cache errors. Never surfaced by the cache-aside store; logged and swallowed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Database(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_reference_message() {
        let err = Error::MalformedReference("not-a-repo".to_string());
        assert!(err.to_string().contains("not-a-repo"));
    }

    #[test]
    fn test_fetch_error_remote_status() {
        let err = FetchError::Remote { status: 503 };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_cancelled_distinct_from_not_found() {
        assert_ne!(FetchError::Cancelled, FetchError::NotFound);
        assert_ne!(
            FetchError::Cancelled,
            FetchError::Transport("timeout".to_string())
        );
    }

    #[test]
    fn test_store_error_messages() {
        assert!(
            StoreError::AlreadyExists("alice".to_string())
                .to_string()
                .contains("alice")
        );
        assert!(
            StoreError::NotFound("bob".to_string())
                .to_string()
                .contains("bob")
        );
    }

    #[test]
    fn test_error_from_store_error() {
        let err: Error = StoreError::NotFound("carol".to_string()).into();

        match err {
            Error::Store(StoreError::NotFound(key)) => assert_eq!(key, "carol"),
            _ => panic!("Expected Error::Store(StoreError::NotFound)"),
        }
    }

    #[test]
    fn test_error_from_fetch_error() {
        let err: Error = FetchError::NotFound.into();

        match err {
            Error::Fetch(FetchError::NotFound) => (),
            _ => panic!("Expected Error::Fetch(FetchError::NotFound)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}
