/// # Terminal Operations Errors
/// This module defines the `TerminalError` enum, which encapsulates every failure the terminal operations engine can surface.
/// The first group of variants is the operational taxonomy returned to callers (not found, illegal state, safety veto,
/// concurrency conflict, bad input); the rest cover the boundary and the infrastructure underneath it.


use thiserror::Error;
use sqlx_oldapi::Error as SqlxError;
use std::io;
use tokio::sync::mpsc::error::{SendError, TrySendError};

#[derive(Error, Debug)]
pub enum TerminalError {
    /// A referenced booking, truck trip, bay, stop-work order or recommendation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation is illegal for the current state-machine position.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested edge is not part of the lifecycle graph.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// An active stop-work order vetoed the operation.
    #[error("Blocked by safety gate: {0}")]
    Blocked(String),

    /// A precondition no longer holds because another operation won the race.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No authenticated actor accompanied the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The actor is authenticated but not permitted to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The actor exceeded the request budget for the operation.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Represents errors originating from database interactions.
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    /// Represents errors related to establishing or maintaining outbound connections.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Represents errors arising from misconfigurations or invalid settings.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Represents errors that occur during serialization or deserialization of data.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Represents errors when sending data over a channel.
    #[error("Channel send error: {0}")]
    ChannelSendError(String),
}

impl TerminalError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        TerminalError::NotFound { entity, id: id.into() }
    }

    /// Stable machine-readable code returned to callers alongside the request id.
    pub fn code(&self) -> &'static str {
        match self {
            TerminalError::NotFound { .. } => "NOT_FOUND",
            TerminalError::InvalidState(_) => "INVALID_STATE",
            TerminalError::InvalidTransition { .. } => "INVALID_TRANSITION",
            TerminalError::Blocked(_) => "BLOCKED",
            TerminalError::Conflict(_) => "CONFLICT",
            TerminalError::Validation(_) => "VALIDATION",
            TerminalError::Unauthorized(_) => "UNAUTHORIZED",
            TerminalError::Forbidden(_) => "FORBIDDEN",
            TerminalError::RateLimited(_) => "RATE_LIMITED",
            TerminalError::DatabaseError(_)
            | TerminalError::ConnectionError(_)
            | TerminalError::ConfigError(_)
            | TerminalError::IoError(_)
            | TerminalError::SerializationError(_)
            | TerminalError::ChannelSendError(_) => "INTERNAL",
        }
    }
}

impl<T> From<SendError<T>> for TerminalError {
    fn from(err: SendError<T>) -> Self {
        TerminalError::ChannelSendError(err.to_string())
    }
}

impl<T> From<TrySendError<T>> for TerminalError {
    fn from(err: TrySendError<T>) -> Self {
        TerminalError::ChannelSendError(err.to_string())
    }
}

impl From<config::ConfigError> for TerminalError {
    fn from(err: config::ConfigError) -> Self {
        TerminalError::ConfigError(err.to_string())
    }
}

pub type TerminalResult<T> = Result<T, TerminalError>;
