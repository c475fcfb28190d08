//! Shared primitives for the Wayfarer workflow kernel crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag carried by every executable node in a module tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Step,
    Action,
    Decision,
    Repeat,
}

impl NodeKind {
    /// Prefix a human-readable id with this kind tag, e.g. `STEP-login`.
    pub fn tagged(&self, id: &str) -> String {
        format!("{}-{}", self, id)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NodeKind::Step => "STEP",
            NodeKind::Action => "ACTION",
            NodeKind::Decision => "DECISION",
            NodeKind::Repeat => "REPEAT",
        };
        write!(f, "{}", tag)
    }
}

/// Shared mutable state threaded through one module run.
///
/// `data` is the input payload handed to `Module::start`, `result` is what
/// the run resolves with. Both are dynamic JSON values so that arbitrary
/// automation payloads flow through without a type parameter on every node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Input payload for the run.
    pub data: Option<Value>,

    /// Output payload accumulated by steps.
    pub result: Option<Value>,

    /// When the top-level run began.
    pub started_at: Option<DateTime<Utc>>,

    /// Whether top-level execution has begun (setup errors happen before).
    pub on_exec: bool,

    /// Cleared by the module when any part of the run fails.
    pub success: bool,

    /// Id of the top-level node currently running, for diagnostics.
    pub ongoing_step: Option<String>,

    /// Current nesting depth, used to indent log output.
    pub level: u32,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            data: None,
            result: None,
            started_at: None,
            on_exec: false,
            success: true,
            ongoing_step: None,
            level: 0,
        }
    }
}

impl ExecutionState {
    /// Shallow-merge a patch into this state. Fields the patch leaves unset
    /// keep their current values.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(data) = patch.data {
            self.data = Some(data);
        }
        if let Some(result) = patch.result {
            self.result = Some(result);
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(on_exec) = patch.on_exec {
            self.on_exec = on_exec;
        }
        if let Some(success) = patch.success {
            self.success = success;
        }
        if let Some(ongoing_step) = patch.ongoing_step {
            self.ongoing_step = Some(ongoing_step);
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
    }
}

/// Partial overwrite of [`ExecutionState`]; unset fields are retained.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    pub data: Option<Value>,
    pub result: Option<Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub on_exec: Option<bool>,
    pub success: Option<bool>,
    pub ongoing_step: Option<String>,
    pub level: Option<u32>,
}

impl StatePatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the result payload.
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Set the run start timestamp.
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Set the top-level-execution flag.
    pub fn with_on_exec(mut self, on_exec: bool) -> Self {
        self.on_exec = Some(on_exec);
        self
    }

    /// Set the success flag.
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Set the ongoing-step diagnostic id.
    pub fn with_ongoing_step(mut self, ongoing_step: impl Into<String>) -> Self {
        self.ongoing_step = Some(ongoing_step.into());
        self
    }

    /// Set the nesting level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }
}

/// Error raised while executing a module tree.
///
/// Wraps the original failure unchanged and carries the ordered list of node
/// ids the error crossed while unwinding, outermost first. The failing leaf
/// seeds the trail; every enclosing composite pushes its own id in front, so
/// the rendered path reconstructs which nested branch failed.
#[derive(Debug)]
pub struct ExecError {
    trail: Vec<String>,
    source: anyhow::Error,
}

impl ExecError {
    /// Wrap a failure with an empty trail.
    pub fn new(source: anyhow::Error) -> Self {
        Self {
            trail: Vec::new(),
            source,
        }
    }

    /// Push a node id in front of the trail as the error unwinds.
    pub fn push_ancestor(mut self, id: &str) -> Self {
        self.trail.insert(0, id.to_string());
        self
    }

    /// Ancestor node ids, outermost first, ending at the failing node.
    pub fn trail(&self) -> &[String] {
        &self.trail
    }

    /// The underlying failure, unchanged.
    pub fn source_error(&self) -> &anyhow::Error {
        &self.source
    }

    /// Consume the wrapper and recover the underlying failure.
    pub fn into_source(self) -> anyhow::Error {
        self.source
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trail.is_empty() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}: {}", self.trail.join(" > "), self.source)
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Result alias used across the execution engine.
pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_defaults() {
        let state = ExecutionState::default();
        assert!(!state.on_exec);
        assert!(state.success);
        assert_eq!(state.level, 0);
        assert!(state.data.is_none());
        assert!(state.result.is_none());
    }

    #[test]
    fn patch_merge_retains_unset_fields() {
        let mut state = ExecutionState {
            data: Some(json!({"user": "ada"})),
            result: Some(json!({"n": 1})),
            ..Default::default()
        };

        state.apply(StatePatch::new().with_level(5));

        assert_eq!(state.level, 5);
        assert_eq!(state.data, Some(json!({"user": "ada"})));
        assert_eq!(state.result, Some(json!({"n": 1})));
        assert!(state.success);
    }

    #[test]
    fn patch_overwrites_set_fields() {
        let mut state = ExecutionState::default();
        state.apply(
            StatePatch::new()
                .with_result(json!({"n": 2}))
                .with_ongoing_step("STEP-login")
                .with_success(false),
        );

        assert_eq!(state.result, Some(json!({"n": 2})));
        assert_eq!(state.ongoing_step.as_deref(), Some("STEP-login"));
        assert!(!state.success);
    }

    #[test]
    fn node_kind_tagging() {
        assert_eq!(NodeKind::Step.tagged("login"), "STEP-login");
        assert_eq!(NodeKind::Decision.tagged("route"), "DECISION-route");
    }

    #[test]
    fn error_trail_renders_dotted_path() {
        let err = ExecError::new(anyhow::anyhow!("selector not found"))
            .push_ancestor("STEP-click")
            .push_ancestor("DECISION-route")
            .push_ancestor("REPEAT-outer");

        assert_eq!(
            err.trail(),
            ["REPEAT-outer", "DECISION-route", "STEP-click"]
        );
        assert_eq!(
            err.to_string(),
            "REPEAT-outer > DECISION-route > STEP-click: selector not found"
        );
    }

    #[test]
    fn error_without_trail_renders_source_only() {
        let err = ExecError::new(anyhow::anyhow!("launch failed"));
        assert_eq!(err.to_string(), "launch failed");
    }
}
