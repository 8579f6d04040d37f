//! Error types for lastro.

use thiserror::Error;

/// Result type alias using lastro's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lastro operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query text rejected or could not be executed
    #[error("Query error: {0}")]
    Query(String),

    /// Natural-language translation failed
    #[error("Translation error: {0}")]
    Translation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_query() {
        let err = Error::Query("only SELECT statements are accepted".to_string());
        assert_eq!(
            err.to_string(),
            "Query error: only SELECT statements are accepted"
        );
    }

    #[test]
    fn test_error_display_translation() {
        let err = Error::Translation("model timeout".to_string());
        assert_eq!(err.to_string(), "Translation error: model timeout");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("bad LOG_FORMAT".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad LOG_FORMAT");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty prompt".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty prompt");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
