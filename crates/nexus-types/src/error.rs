use thiserror::Error;

use crate::bot::{BotId, TeamId};
use crate::session::SessionPhase;

/// Errors surfaced by collaboration session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("access denied")]
    Forbidden,

    #[error("session in {phase} phase: {reason}")]
    InvalidPhase { phase: SessionPhase, reason: String },

    #[error("team '{0}' not found")]
    TeamNotFound(TeamId),

    #[error("bot '{0}' not found in team")]
    BotNotFound(BotId),

    #[error("suggestion '{0}' not found")]
    SuggestionNotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("concurrent update: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl SessionError {
    pub fn invalid_phase(phase: SessionPhase, reason: impl Into<String>) -> Self {
        SessionError::InvalidPhase {
            phase,
            reason: reason.into(),
        }
    }
}

impl From<RepositoryError> for SessionError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => SessionError::Conflict(msg),
            RepositoryError::NotFound => SessionError::NotFound,
            other => SessionError::Storage(other.to_string()),
        }
    }
}

/// Errors from repository operations (used by trait definitions in nexus-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
