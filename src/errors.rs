// errors.rs
use astra::Response;
use thiserror::Error;

use crate::commands::CommandError;
use crate::domain::change::TransitionError;

/// Errors originating from either the server logic
/// (routing, missing resources, etc.) or downstream layers (DB).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database Error: {0}")]
    DbError(String),
    /// A stored row could not be decoded into its domain type.
    #[error("Bad Data: {0}")]
    BadData(String),
    #[error("Store Unavailable: {0}")]
    Unavailable(String),
    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),
    #[error("Internal Server Error")]
    InternalError,
}

// Type alias commonly used by route handlers.
pub type ResultResp = Result<Response, ServerError>;

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

impl From<CommandError> for ServerError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Unauthorized => ServerError::Unauthorized(e.to_string()),
            CommandError::NotFound(what) => {
                tracing::debug!("command target missing: {what}");
                ServerError::NotFound
            }
            CommandError::Invalid(msg) => ServerError::BadRequest(msg),
            CommandError::Transition(TransitionError::MissingReason) => {
                ServerError::BadRequest(TransitionError::MissingReason.to_string())
            }
            CommandError::Transition(t) => ServerError::Conflict(t.to_string()),
            CommandError::Sevis(s) => ServerError::Unavailable(s.to_string()),
            CommandError::Store(s) => s,
        }
    }
}
