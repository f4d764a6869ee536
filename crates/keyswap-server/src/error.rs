//! Server error types.

use std::fmt;

/// Errors that can occur starting or running the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid user id, weak token secret, etc.).
    ///
    /// These are fatal errors that prevent server startup. Fix configuration
    /// and restart.
    Config(String),

    /// Transport/network error (bind failure, I/O error while serving).
    ///
    /// May be transient (network issues) or fatal (bind address in use).
    /// Check error message for details.
    Transport(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::Config("token secret too short".to_string());
        assert_eq!(err.to_string(), "configuration error: token secret too short");

        let err = ServerError::from(std::io::Error::other("address in use"));
        assert_eq!(err.to_string(), "transport error: address in use");
    }
}
