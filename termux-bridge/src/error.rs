//! Error types for the bridge
//!
//! Every request-level failure is a [`BridgeError`]. The listener turns each
//! one into an HTTP response; none of them terminate the process.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures that can occur while handling a single request
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The token is unavailable, so no request can be authorized
    #[error("Server misconfigured: {0}")]
    ServerMisconfigured(String),

    /// Missing or invalid credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request or a command the guard refuses to run
    #[error("{0}")]
    BadRequest(String),

    /// The command exceeded its wall-clock budget
    #[error("Command timed out after {0}s. Interactive commands (editors, pagers, prompts) are not supported; pass non-interactive flags such as -y.")]
    Timeout(u64),

    /// Spawn or I/O failure while running the command
    #[error("Execution failed: {0}")]
    ExecutionFault(String),
}

impl BridgeError {
    /// HTTP status the client branches on
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::ServerMisconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BridgeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BridgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            BridgeError::ExecutionFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code placed in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::ServerMisconfigured(_) => "server_misconfigured",
            BridgeError::Unauthorized(_) => "unauthorized",
            BridgeError::BadRequest(_) => "bad_request",
            BridgeError::Timeout(_) => "timeout",
            BridgeError::ExecutionFault(_) => "execution_fault",
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::ExecutionFault(err.to_string())
    }
}

/// Errors raised while loading configuration at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid deny pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no home directory could be determined; set [server] home")]
    NoHome,
}

/// Result alias for request handling
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BridgeError::ServerMisconfigured("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BridgeError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BridgeError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(BridgeError::Timeout(15).status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            BridgeError::ExecutionFault("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_message_prefix() {
        let err = BridgeError::Unauthorized("missing credential".into());
        assert!(err.to_string().starts_with("Unauthorized"));
    }

    #[test]
    fn test_timeout_message_mentions_interactive() {
        let msg = BridgeError::Timeout(15).to_string();
        assert!(msg.contains("15s"));
        assert!(msg.contains("Interactive"));
    }
}
