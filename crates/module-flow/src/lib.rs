//! Module Orchestration Layer
//!
//! This crate provides the step-composition and execution engine for
//! agent-driven automation: atomic steps, sequential groups, conditional
//! branches, bounded retry groups, and the top-level module lifecycle that
//! acquires and releases the external agent around execution.

pub mod action;
pub mod context;
pub mod decision;
pub mod logging;
pub mod module;
pub mod node;
pub mod repeat;
pub mod step;

pub use action::Action;
pub use context::ExecContext;
pub use decision::{BranchTable, ClassifierFn, Decision};
pub use logging::{FlowLogger, TracingLogger};
pub use module::{
    HookFn, Module, ModuleConfig, PostSetupFn, PreSetupFn, PreSetupOutcome,
    FAILURE_SCREENSHOT_PATH,
};
pub use node::Executable;
pub use repeat::{Repeat, DEFAULT_ATTEMPT_LIMIT};
pub use step::{Step, StepFn};

pub use wayfarer_core_types::{ExecError, ExecResult, ExecutionState, NodeKind, StatePatch};
