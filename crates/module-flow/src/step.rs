//! Atomic step node

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use agent_adapter::AgentHandle;
use wayfarer_core_types::{ExecError, ExecResult, NodeKind, StatePatch};
use wayfarer_proxy_policy::ProxyDirective;

use crate::context::ExecContext;
use crate::logging::{log_info, FlowLogger};
use crate::node::Executable;

/// User-supplied state-transforming function. It receives a snapshot of the
/// current state plus the agent handle and returns the patch to merge, or
/// `None` to leave the state untouched.
pub type StepFn = Box<
    dyn Fn(
            wayfarer_core_types::ExecutionState,
            Option<Arc<dyn AgentHandle>>,
        ) -> BoxFuture<'static, anyhow::Result<Option<StatePatch>>>
        + Send
        + Sync,
>;

/// Leaf executable wrapping a user function, with an optional proxy toggle
/// applied just before the function runs.
pub struct Step {
    id: String,
    step_fn: StepFn,
    proxy: Option<ProxyDirective>,
    logger: Option<Arc<dyn FlowLogger>>,
}

impl Step {
    pub fn new<F>(id: &str, step_fn: F) -> Self
    where
        F: Fn(
                wayfarer_core_types::ExecutionState,
                Option<Arc<dyn AgentHandle>>,
            ) -> BoxFuture<'static, anyhow::Result<Option<StatePatch>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: NodeKind::Step.tagged(id),
            step_fn: Box::new(step_fn),
            proxy: None,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Flip the run's proxy policy before the function runs.
    pub fn with_proxy(mut self, directive: ProxyDirective) -> Self {
        self.proxy = Some(directive);
        self
    }
}

#[async_trait]
impl Executable for Step {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Step
    }

    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<Option<StatePatch>> {
        cx.push_level();
        log_info(
            &self.logger,
            cx.level(),
            &format!("Step '{}' starting.", self.id),
        );
        debug!(step = %self.id, "executing step");

        if let Some(directive) = self.proxy {
            cx.proxy().apply(directive);
            let switched = match directive {
                ProxyDirective::On => "on",
                ProxyDirective::Off => "off",
            };
            log_info(
                &self.logger,
                cx.level(),
                &format!("Step '{}' turned proxy {}.", self.id, switched),
            );
        }

        // A function error propagates with the level still incremented;
        // restoring it is the enclosing run's concern.
        let patch = (self.step_fn)(cx.state().clone(), cx.agent())
            .await
            .map_err(|err| ExecError::new(err).push_ancestor(&self.id))?;

        // Apply the patch here so steps nested inside composites take
        // effect; the module's top-level merge of the same patch is an
        // idempotent re-apply.
        if let Some(patch) = patch.clone() {
            cx.update(patch);
        }

        log_info(
            &self.logger,
            cx.level(),
            &format!("Step '{}' ended.", self.id),
        );
        cx.pop_level();

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::RecordingLogger;
    use serde_json::json;
    use wayfarer_core_types::ExecutionState;
    use wayfarer_proxy_policy::ProxyPolicy;

    fn context() -> ExecContext {
        ExecContext::new(
            ExecutionState::default(),
            Arc::new(ProxyPolicy::new(false, "http://127.0.0.1:8888")),
        )
    }

    #[tokio::test]
    async fn applies_patch_and_restores_level() {
        let step = Step::new("set-result", |_state, _agent| {
            Box::pin(async move { Ok(Some(StatePatch::new().with_result(json!({"n": 1})))) })
        });

        let mut cx = context();
        let patch = step.execute(&mut cx).await.expect("step should succeed");

        assert_eq!(cx.level(), 0);
        assert_eq!(cx.state().result, Some(json!({"n": 1})));
        assert_eq!(
            patch,
            Some(StatePatch::new().with_result(json!({"n": 1})))
        );
    }

    #[tokio::test]
    async fn returning_none_leaves_state_untouched() {
        let step = Step::new("observe", |state, _agent| {
            Box::pin(async move {
                assert!(state.success);
                Ok(None)
            })
        });

        let mut cx = context();
        let patch = step.execute(&mut cx).await.expect("step should succeed");

        assert!(patch.is_none());
        assert_eq!(cx.state(), &ExecutionState::default());
    }

    #[tokio::test]
    async fn function_sees_level_incremented() {
        let step = Step::new("probe", |state, _agent| {
            Box::pin(async move {
                assert_eq!(state.level, 1);
                Ok(None)
            })
        });

        let mut cx = context();
        step.execute(&mut cx).await.expect("step should succeed");
        assert_eq!(cx.level(), 0);
    }

    #[tokio::test]
    async fn proxy_directive_flips_shared_policy() {
        let step = Step::new("enable-proxy", |_state, _agent| {
            Box::pin(async move { Ok(None) })
        })
        .with_proxy(ProxyDirective::On);

        let mut cx = context();
        assert!(!cx.proxy().enabled());
        step.execute(&mut cx).await.expect("step should succeed");
        assert!(cx.proxy().enabled());
    }

    #[tokio::test]
    async fn error_keeps_level_incremented_and_seeds_trail() {
        let step = Step::new("boom", |_state, _agent| {
            Box::pin(async move { Err(anyhow::anyhow!("element not found")) })
        });

        let mut cx = context();
        let err = step.execute(&mut cx).await.expect_err("step should fail");

        assert_eq!(cx.level(), 1);
        assert_eq!(err.trail(), ["STEP-boom"]);
        assert_eq!(err.to_string(), "STEP-boom: element not found");
    }

    #[tokio::test]
    async fn logs_are_indented_by_current_level() {
        let logger = RecordingLogger::shared();
        let step = Step::new("quiet", |_state, _agent| Box::pin(async move { Ok(None) }))
            .with_logger(logger.clone());

        let mut cx = context();
        cx.update(StatePatch::new().with_level(1));
        step.execute(&mut cx).await.expect("step should succeed");

        assert_eq!(
            logger.infos(),
            vec![
                "        Step 'STEP-quiet' starting.",
                "        Step 'STEP-quiet' ended.",
            ]
        );
    }
}
