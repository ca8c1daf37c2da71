//! Runtime error types with rich context

use std::sync::Arc;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    // ─────────────────────────────────────────────────────────────
    // Lifecycle Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Camera runtime is already configured; shut it down before configuring again")]
    AlreadyConfigured,

    #[error("Camera runtime is not configured")]
    NotConfigured,

    #[error("Camera runtime is not initialized")]
    NotInitialized,

    #[error("Camera runtime initialization failed: {cause}")]
    Initialization {
        #[source]
        cause: Arc<Error>,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{operation} did not complete within {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    // ─────────────────────────────────────────────────────────────
    // Provider Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No {kind} provider configured")]
    MissingProvider { kind: &'static str },

    #[error("{kind} provider failed: {message}")]
    Provider { kind: &'static str, message: String },

    #[error("Failed to release {kind}: {message}")]
    Release { kind: &'static str, message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn provider(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            message: message.into(),
        }
    }

    pub fn release(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Release {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The underlying provider failure for initialization errors
    pub fn initialization_cause(&self) -> Option<&Error> {
        match self {
            Error::Initialization { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Check if this error should abort the current epoch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Initialization { .. } | Error::MissingProvider { .. } | Error::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_messages() {
        let err = Error::NotInitialized;
        assert_eq!(err.to_string(), "Camera runtime is not initialized");

        let err = Error::AlreadyConfigured;
        assert!(err.to_string().contains("already configured"));
    }

    fn initialization(cause: Error) -> Error {
        Error::Initialization {
            cause: Arc::new(cause),
        }
    }

    #[test]
    fn test_initialization_wraps_cause() {
        let err = initialization(Error::MissingProvider {
            kind: "camera factory",
        });

        assert!(err.to_string().contains("No camera factory provider configured"));
        assert!(matches!(
            err.initialization_cause(),
            Some(Error::MissingProvider { .. })
        ));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(initialization(Error::provider("camera factory", "boom")).is_fatal());
        assert!(Error::MissingProvider {
            kind: "camera factory"
        }
        .is_fatal());
        assert!(!Error::NotInitialized.is_fatal());
    }

    #[test]
    fn test_timeout_message() {
        let timeout = Error::Timeout {
            operation: "initialization",
            after_ms: 250,
        };
        assert!(!timeout.is_fatal());
        assert_eq!(
            timeout.to_string(),
            "initialization did not complete within 250ms"
        );
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("[runtime").unwrap_err();
        let err: Error = toml_err.into();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::provider("camera factory", "test");
        let _ = Error::release("surface manager", "test");
        let _ = Error::config("test");
        let _ = Error::invalid_argument("test");
    }
}
