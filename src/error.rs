use rusqlite::Error as RusqliteError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbPilotError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Lookup yielded zero rows
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lookup yielded more than one row where exactly one was required
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid change format: {0}")]
    InvalidChangeFormat(String),

    #[error("empty sql statement")]
    EmptyStatement,

    #[error("{0}")]
    ConnectionError(String),

    /// The engine rejected the statement. The message is the driver's own.
    #[error("{0}")]
    DriverError(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Unknown webhook receiver: {0}")]
    UnknownReceiver(String),

    #[error(transparent)]
    NotificationError(#[from] NotificationError),

    /// Produced only when a task invocation panics
    #[error("{0}")]
    InternalError(String),

    #[error("Error: {0}")]
    Error(String),
}

/// Failure delivering a webhook.
///
/// `Transport` means the message never got a usable answer (host unreachable,
/// unreadable body, invalid JSON). `Rejected` means the platform answered and
/// refused the message; it carries the platform's own message verbatim.
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Rejected(String),
}

impl NotificationError {
    pub fn is_rejected(&self) -> bool {
        matches!(self, NotificationError::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_error_display_is_verbatim() {
        let err: DbPilotError = NotificationError::Rejected("token is invalid".into()).into();
        assert_eq!(err.to_string(), "token is invalid");
    }

    #[test]
    fn test_notification_error_kinds() {
        assert!(NotificationError::Rejected("x".into()).is_rejected());
        assert!(!NotificationError::Transport("x".into()).is_rejected());
    }

    #[test]
    fn test_empty_statement_message() {
        assert_eq!(DbPilotError::EmptyStatement.to_string(), "empty sql statement");
    }
}
