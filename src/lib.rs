//! Wayfarer
//!
//! Composable workflow orchestration for automation tasks driven by an
//! external interactive agent (e.g. a browser-control session). Callers
//! assemble a tree of executable nodes — atomic [`Step`]s, sequential
//! [`Action`]s, branching [`Decision`]s, and bounded-retry [`Repeat`]s —
//! and hand it to a [`Module`], which owns the run lifecycle: state
//! initialization, agent acquisition, sequential execution, error/success
//! hooks, and guaranteed agent release.
//!
//! The agent itself is consumed through the narrow capability traits in
//! [`agent`]; no concrete automation backend is linked here.

pub use module_flow::{
    Action, BranchTable, Decision, ExecContext, Executable, FlowLogger, Module, ModuleConfig,
    PreSetupOutcome, Repeat, Step, TracingLogger, DEFAULT_ATTEMPT_LIMIT, FAILURE_SCREENSHOT_PATH,
};

pub use wayfarer_core_types::{
    ExecError, ExecResult, ExecutionState, NodeKind, StatePatch,
};

pub use wayfarer_proxy_policy::{ProxyDirective, ProxyPolicy};

/// Capability interface to the external automation agent.
pub mod agent {
    pub use agent_adapter::{
        stub, AdapterError, AgentDriver, AgentHandle, AgentSession, ImageFormat,
        InterceptedRequest, LaunchOptions, RequestCallback, SessionCallback,
    };
}
