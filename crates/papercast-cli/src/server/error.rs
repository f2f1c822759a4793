//! Server startup errors.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type ServeResult<T> = std::result::Result<T, ServeError>;

/// Errors raised while starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Server configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to bind to the specified address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Runtime server error.
    #[error("Runtime error: {0}")]
    Runtime(#[source] io::Error),
}

impl ServeError {
    /// Creates an invalid configuration error from an anyhow error.
    pub fn invalid_config(err: &anyhow::Error) -> Self {
        Self::InvalidConfig(format!("{err:#}"))
    }

    /// Creates a bind error with address context.
    pub fn bind_error(address: &str, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_owned(),
            source,
        }
    }

    /// Returns whether retrying with a different environment may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig(_) => false,
            Self::BindError { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::PermissionDenied
                    | io::ErrorKind::AddrInUse
                    | io::ErrorKind::AddrNotAvailable
            ),
            Self::Runtime(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_errors_in_use_are_recoverable() {
        let error = ServeError::bind_error(
            "127.0.0.1:3000",
            io::Error::from(io::ErrorKind::AddrInUse),
        );
        assert!(error.is_recoverable());
        assert!(error.to_string().contains("127.0.0.1:3000"));
    }

    #[test]
    fn invalid_config_is_not_recoverable() {
        let error = ServeError::invalid_config(&anyhow::anyhow!("port too low"));
        assert!(!error.is_recoverable());
    }
}
