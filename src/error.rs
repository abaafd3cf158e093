//! Error types for chat-context

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type for context operations
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors that can occur during context management
#[derive(Error, Debug)]
pub enum ContextError {
    /// For callers driving a [`CompletionClient`](crate::CompletionClient)
    /// with `?`. The manager never returns it: summary failures fall back and
    /// reply failures come back as a marked [`TurnReply`](crate::TurnReply).
    #[error("Remote completion failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_or_propagate(
        outcome: std::result::Result<String, RemoteError>,
    ) -> Result<String> {
        Ok(outcome?)
    }

    #[test]
    fn test_remote_error_converts_with_question_mark() {
        let err = complete_or_propagate(Err(RemoteError::EmptyResponse)).unwrap_err();
        assert!(matches!(err, ContextError::Remote(RemoteError::EmptyResponse)));
        assert!(err.to_string().starts_with("Remote completion failed"));

        assert_eq!(complete_or_propagate(Ok("ok".to_string())).unwrap(), "ok");
    }

    #[test]
    fn test_session_not_found_message() {
        let err = ContextError::SessionNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Session not found: abc");
    }
}
