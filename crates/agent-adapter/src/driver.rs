//! Agent capability traits

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::errors::AdapterError;
use crate::options::{ImageFormat, LaunchOptions};

/// Callback invoked for every session the agent creates.
pub type SessionCallback = Arc<dyn Fn(Arc<dyn AgentSession>) + Send + Sync>;

/// Callback invoked for every intercepted request inside a session.
/// The callback decides whether the request proceeds or is rerouted.
pub type RequestCallback =
    Arc<dyn Fn(Arc<dyn InterceptedRequest>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Entry point: launches one live agent session resource.
#[async_trait]
pub trait AgentDriver: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn AgentHandle>, AdapterError>;
}

/// One live agent instance. Exactly one handle is live per module run and it
/// must be closed exactly once, whichever way the run ends.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    /// Register a callback fired for every newly created page/session.
    fn on_new_session(&self, callback: SessionCallback);

    /// Currently live sessions, oldest first.
    async fn sessions(&self) -> Vec<Arc<dyn AgentSession>>;

    /// Release the agent resource.
    async fn close(&self) -> Result<(), AdapterError>;
}

/// A single page/session inside the agent.
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Register a request-interception callback for this session.
    fn on_request(&self, callback: RequestCallback);

    /// Capture a screenshot of the session to `path`.
    async fn screenshot(&self, path: &Path, format: ImageFormat) -> Result<(), AdapterError>;
}

/// A request paused by interception, waiting for a routing decision.
#[async_trait]
pub trait InterceptedRequest: Send + Sync {
    fn url(&self) -> &str;

    /// Let the request continue unmodified.
    async fn proceed(&self) -> Result<(), AdapterError>;

    /// Route the request through the given proxy address.
    async fn reroute(&self, proxy_address: &str) -> Result<(), AdapterError>;
}
