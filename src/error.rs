//! Error types surfaced by the actor execution core.

use thiserror::Error;

use crate::types::ExitReason;

/// Result type for actor operations.
pub type ActorResult<T> = Result<T, ActorError>;

/// Errors returned from behaviors, timeout handlers and `Actor::init`.
///
/// Every variant is fatal to the actor once it reaches the resume loop:
/// [`ActorError::Exit`] finalizes with the carried reason, everything else
/// finalizes with [`ExitReason::UnhandledFault`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// A custom error message from the actor.
    #[error("actor logic error: {0}")]
    User(String),
    /// The actor requested termination with the given reason.
    #[error("actor exited: {0}")]
    Exit(ExitReason),
    /// A handler panicked during execution.
    #[error("actor panicked: {0}")]
    Panic(String),
    /// A behavior timeout could not be armed.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

impl ActorError {
    /// Creates a new user-defined error.
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// Creates an explicit termination request.
    pub fn exit(reason: ExitReason) -> Self {
        Self::Exit(reason)
    }

    /// Exit reason the resume loop finalizes with for this error.
    pub fn exit_reason(&self) -> ExitReason {
        match self {
            ActorError::Exit(reason) => *reason,
            _ => ExitReason::UnhandledFault,
        }
    }
}

/// Failures encountered while enqueueing a message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The bounded mailbox is full.
    #[error("mailbox full")]
    Full,
    /// The actor has finished and no longer accepts messages.
    #[error("mailbox closed")]
    Closed,
}

/// Failures encountered when spawning an actor on the Tokio scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// No Tokio runtime was found in the current context.
    #[error("tokio runtime handle not in scope")]
    MissingRuntime,
}

/// Errors emitted while arming behavior timeouts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A non-zero timeout needs a Tokio runtime to sleep on.
    #[error("tokio runtime handle not in scope, cannot arm a {0:?} timeout")]
    MissingRuntime(std::time::Duration),
}
