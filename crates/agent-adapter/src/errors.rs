//! Adapter error types

use thiserror::Error;

/// Errors surfaced by an automation-agent driver.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Launching the agent failed
    #[error("agent launch failed: {0}")]
    Launch(String),

    /// No usable session for the requested operation
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// Screenshot capture failed
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// Request interception failed
    #[error("request interception failed: {0}")]
    Interception(String),

    /// The handle was already closed
    #[error("agent already closed")]
    Closed,

    /// Driver-internal failure
    #[error("internal adapter error: {0}")]
    Internal(String),
}
