//! Capability interface to the external automation agent.
//!
//! The orchestration core consumes the agent exclusively through these
//! traits: acquire a handle, get notified of new sessions, register request
//! interception, take screenshots, close. No concrete automation
//! implementation is linked here; drivers live in their own crates and the
//! [`stub`] module provides a recording implementation for tests.

pub mod driver;
pub mod errors;
pub mod options;
pub mod stub;

pub use driver::{
    AgentDriver, AgentHandle, AgentSession, InterceptedRequest, RequestCallback, SessionCallback,
};
pub use errors::AdapterError;
pub use options::{ImageFormat, LaunchOptions};
