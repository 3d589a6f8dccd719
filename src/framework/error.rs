//! # Framework Errors
//!
//! This module defines the common error type used throughout the actor runtime.
//! Sending to a dead actor is deliberately *not* an error: `invoke` is a silent no-op and
//! `ask` resolves to [`ActorError::ActorDropped`].

/// Errors that can occur within the actor runtime itself.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The message was never executed: the actor was gone or its mailbox closed.
    #[error("Actor dropped response channel")]
    ActorDropped,
    /// The operation panicked while running on the actor's execution context.
    #[error("Actor operation panicked: {0}")]
    Panicked(String),
    /// Building the wrapped object panicked or returned an error.
    #[error("Actor construction failed: {0}")]
    ConstructionFailed(String),
    /// The run loop no longer accepts tasks.
    #[error("Run loop stopped")]
    LoopStopped,
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
