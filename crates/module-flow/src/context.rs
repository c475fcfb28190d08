//! Per-run execution context

use std::sync::Arc;

use agent_adapter::AgentHandle;
use wayfarer_core_types::{ExecutionState, StatePatch};
use wayfarer_proxy_policy::ProxyPolicy;

/// The shared execution-state container for one module run.
///
/// A fresh context is created inside every [`Module::start`](crate::Module::start)
/// call and passed by `&mut` through every nested node's `execute`, so two
/// runs can never observe each other's state. It owns the run's
/// [`ExecutionState`], the agent-handle slot, and the proxy policy the run's
/// request hook reads.
pub struct ExecContext {
    state: ExecutionState,
    agent: Option<Arc<dyn AgentHandle>>,
    proxy: Arc<ProxyPolicy>,
}

impl ExecContext {
    pub fn new(initial: ExecutionState, proxy: Arc<ProxyPolicy>) -> Self {
        Self {
            state: initial,
            agent: None,
            proxy,
        }
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Shallow-merge a patch into the current state; unset fields retained.
    pub fn update(&mut self, patch: StatePatch) {
        self.state.apply(patch);
    }

    /// Current nesting depth. A fresh context reports 0.
    pub fn level(&self) -> u32 {
        self.state.level
    }

    pub fn agent(&self) -> Option<Arc<dyn AgentHandle>> {
        self.agent.as_ref().map(Arc::clone)
    }

    pub fn set_agent(&mut self, agent: Arc<dyn AgentHandle>) {
        self.agent = Some(agent);
    }

    /// Remove the agent handle from the slot for teardown, leaving it empty.
    pub fn take_agent(&mut self) -> Option<Arc<dyn AgentHandle>> {
        self.agent.take()
    }

    pub fn proxy(&self) -> &Arc<ProxyPolicy> {
        &self.proxy
    }

    pub(crate) fn push_level(&mut self) {
        self.state.level += 1;
    }

    pub(crate) fn pop_level(&mut self) {
        self.state.level = self.state.level.saturating_sub(1);
    }
}
