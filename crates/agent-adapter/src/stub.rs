//! Recording stub implementations of the agent capability traits.
//!
//! Used by the engine's own test suites and by downstream consumers that
//! need a driver without a real automation backend attached.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::driver::{
    AgentDriver, AgentHandle, AgentSession, InterceptedRequest, RequestCallback, SessionCallback,
};
use crate::errors::AdapterError;
use crate::options::{ImageFormat, LaunchOptions};

/// Driver that records every launch and hands out [`StubAgent`] handles.
#[derive(Default)]
pub struct StubDriver {
    fail_launch: AtomicBool,
    launches: Mutex<Vec<LaunchOptions>>,
    handles: Mutex<Vec<Arc<StubAgent>>>,
}

impl StubDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver whose `launch` always fails, for setup-error paths.
    pub fn failing() -> Self {
        let driver = Self::new();
        driver.fail_launch.store(true, Ordering::SeqCst);
        driver
    }

    /// Options recorded for each launch, in order.
    pub fn launches(&self) -> Vec<LaunchOptions> {
        self.launches.lock().clone()
    }

    /// Handles created so far, in launch order.
    pub fn handles(&self) -> Vec<Arc<StubAgent>> {
        self.handles.lock().clone()
    }
}

#[async_trait]
impl AgentDriver for StubDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<Arc<dyn AgentHandle>, AdapterError> {
        self.launches.lock().push(options.clone());
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(AdapterError::Launch("stub driver set to fail".into()));
        }
        let agent = Arc::new(StubAgent::default());
        self.handles.lock().push(Arc::clone(&agent));
        debug!("stub agent launched");
        Ok(agent)
    }
}

/// Recording agent handle. Sessions are opened explicitly by tests via
/// [`StubAgent::open_session`], which fires the registered callbacks the way
/// a real agent announces new pages.
#[derive(Default)]
pub struct StubAgent {
    sessions: Mutex<Vec<Arc<StubSession>>>,
    session_callbacks: Mutex<Vec<SessionCallback>>,
    close_count: AtomicUsize,
}

impl StubAgent {
    /// Open a new session and notify every registered callback.
    pub fn open_session(&self) -> Arc<StubSession> {
        let session = Arc::new(StubSession::default());
        self.sessions.lock().push(Arc::clone(&session));
        let callbacks = self.session_callbacks.lock().clone();
        for callback in callbacks {
            callback(Arc::clone(&session) as Arc<dyn AgentSession>);
        }
        session
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.close_count() > 0
    }

    /// Sessions as their concrete stub type, for assertions.
    pub fn stub_sessions(&self) -> Vec<Arc<StubSession>> {
        self.sessions.lock().clone()
    }
}

#[async_trait]
impl AgentHandle for StubAgent {
    fn on_new_session(&self, callback: SessionCallback) {
        self.session_callbacks.lock().push(callback);
    }

    async fn sessions(&self) -> Vec<Arc<dyn AgentSession>> {
        self.sessions
            .lock()
            .iter()
            .map(|session| Arc::clone(session) as Arc<dyn AgentSession>)
            .collect()
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        debug!("stub agent closed");
        Ok(())
    }
}

/// Recording session. Tests push requests through [`StubSession::emit_request`]
/// to exercise interception callbacks.
#[derive(Default)]
pub struct StubSession {
    request_callbacks: Mutex<Vec<RequestCallback>>,
    screenshots: Mutex<Vec<PathBuf>>,
}

impl StubSession {
    /// Run every registered request callback against a fresh request and
    /// return it so the routing outcome can be inspected.
    pub async fn emit_request(&self, url: &str) -> Arc<StubRequest> {
        let request = Arc::new(StubRequest::new(url));
        let callbacks = self.request_callbacks.lock().clone();
        for callback in callbacks {
            callback(Arc::clone(&request) as Arc<dyn InterceptedRequest>).await;
        }
        request
    }

    /// Paths screenshots were requested at, in order.
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.screenshots.lock().clone()
    }
}

#[async_trait]
impl AgentSession for StubSession {
    fn on_request(&self, callback: RequestCallback) {
        self.request_callbacks.lock().push(callback);
    }

    async fn screenshot(&self, path: &Path, format: ImageFormat) -> Result<(), AdapterError> {
        self.screenshots.lock().push(path.to_path_buf());
        std::fs::write(path, format.to_string().as_bytes())
            .map_err(|err| AdapterError::Screenshot(err.to_string()))
    }
}

/// Routing decision recorded for a stub request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Proceeded,
    Rerouted(String),
}

/// Request handed to interception callbacks by [`StubSession::emit_request`].
pub struct StubRequest {
    url: String,
    outcome: Mutex<Option<RequestOutcome>>,
}

impl StubRequest {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            outcome: Mutex::new(None),
        }
    }

    /// The decision the callback made, if any.
    pub fn outcome(&self) -> Option<RequestOutcome> {
        self.outcome.lock().clone()
    }
}

#[async_trait]
impl InterceptedRequest for StubRequest {
    fn url(&self) -> &str {
        &self.url
    }

    async fn proceed(&self) -> Result<(), AdapterError> {
        *self.outcome.lock() = Some(RequestOutcome::Proceeded);
        Ok(())
    }

    async fn reroute(&self, proxy_address: &str) -> Result<(), AdapterError> {
        *self.outcome.lock() = Some(RequestOutcome::Rerouted(proxy_address.to_string()));
        Ok(())
    }
}
