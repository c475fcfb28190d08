//! Branch dispatch node

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::debug;

use agent_adapter::AgentHandle;
use wayfarer_core_types::{ExecError, ExecResult, ExecutionState, NodeKind, StatePatch};

use crate::context::ExecContext;
use crate::logging::{log_error, log_info, FlowLogger};
use crate::node::Executable;

/// Classifier over the current state and agent, yielding a branch key.
pub type ClassifierFn = Box<
    dyn Fn(ExecutionState, Option<Arc<dyn AgentHandle>>) -> BoxFuture<'static, anyhow::Result<String>>
        + Send
        + Sync,
>;

/// Key-to-nodes table dispatched by [`Decision`]. Keys are looked up
/// verbatim and need not cover every classifier output.
pub type BranchTable = HashMap<String, Vec<Box<dyn Executable>>>;

/// Runs a classifier against the current state and executes the matching
/// branch. A key with no branch is logged and is not a failure.
pub struct Decision {
    id: String,
    classifier: ClassifierFn,
    branches: BranchTable,
    logger: Option<Arc<dyn FlowLogger>>,
}

impl Decision {
    pub fn new<F>(id: &str, classifier: F, branches: BranchTable) -> Self
    where
        F: Fn(
                ExecutionState,
                Option<Arc<dyn AgentHandle>>,
            ) -> BoxFuture<'static, anyhow::Result<String>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            id: NodeKind::Decision.tagged(id),
            classifier: Box::new(classifier),
            branches,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

#[async_trait]
impl Executable for Decision {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Decision
    }

    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<Option<StatePatch>> {
        cx.push_level();
        log_info(
            &self.logger,
            cx.level(),
            &format!("Decision '{}' starting.", self.id),
        );

        let key = (self.classifier)(cx.state().clone(), cx.agent())
            .await
            .map_err(|err| ExecError::new(err).push_ancestor(&self.id))?;
        debug!(decision = %self.id, %key, "classifier returned");

        match self.branches.get(&key) {
            Some(branch) => {
                for step in branch {
                    step.execute(cx)
                        .await
                        .map_err(|err| err.push_ancestor(&self.id))?;
                }
            }
            None => {
                log_error(
                    &self.logger,
                    cx.level(),
                    &format!("No actions found for key '{}'.", key),
                );
            }
        }

        log_info(
            &self.logger,
            cx.level(),
            &format!("Decision '{}' ended.", self.id),
        );
        cx.pop_level();

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::testing::RecordingLogger;
    use crate::step::Step;
    use serde_json::json;
    use wayfarer_proxy_policy::ProxyPolicy;

    fn context() -> ExecContext {
        ExecContext::new(
            ExecutionState::default(),
            Arc::new(ProxyPolicy::new(false, "")),
        )
    }

    fn set_result(id: &str, value: serde_json::Value) -> Box<dyn Executable> {
        Box::new(Step::new(id, move |_state, _agent| {
            let value = value.clone();
            Box::pin(async move { Ok(Some(StatePatch::new().with_result(value))) })
        }))
    }

    fn branches() -> BranchTable {
        let mut table = BranchTable::new();
        table.insert("go".into(), vec![set_result("go-step", json!("went"))]);
        table.insert("stay".into(), vec![set_result("stay-step", json!("stayed"))]);
        table
    }

    #[tokio::test]
    async fn matched_key_runs_exactly_that_branch() {
        let decision = Decision::new(
            "route",
            |_state, _agent| Box::pin(async move { Ok("go".to_string()) }),
            branches(),
        );

        let mut cx = context();
        decision
            .execute(&mut cx)
            .await
            .expect("decision should succeed");

        assert_eq!(cx.state().result, Some(json!("went")));
        assert_eq!(cx.level(), 0);
    }

    #[tokio::test]
    async fn classifier_reads_current_state() {
        let decision = Decision::new(
            "inspect",
            |state, _agent| {
                Box::pin(async move {
                    Ok(state
                        .data
                        .and_then(|data| data.as_str().map(str::to_string))
                        .unwrap_or_else(|| "stay".to_string()))
                })
            },
            branches(),
        );

        let mut cx = context();
        cx.update(StatePatch::new().with_data(json!("go")));
        decision
            .execute(&mut cx)
            .await
            .expect("decision should succeed");

        assert_eq!(cx.state().result, Some(json!("went")));
    }

    #[tokio::test]
    async fn unmatched_key_logs_and_completes_normally() {
        let logger = RecordingLogger::shared();
        let decision = Decision::new(
            "route",
            |_state, _agent| Box::pin(async move { Ok("teleport".to_string()) }),
            branches(),
        )
        .with_logger(logger.clone());

        let mut cx = context();
        decision
            .execute(&mut cx)
            .await
            .expect("an unmatched key is not a failure");

        assert!(cx.state().result.is_none());
        assert_eq!(cx.level(), 0);
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("No actions found for key 'teleport'."));
    }

    #[test]
    fn classifier_error_carries_decision_id() {
        let decision = Decision::new(
            "route",
            |_state, _agent| Box::pin(async move { Err(anyhow::anyhow!("classifier blew up")) }),
            branches(),
        );

        let mut cx = context();
        let err = tokio_test::block_on(decision.execute(&mut cx))
            .expect_err("decision should fail");

        assert_eq!(err.trail(), ["DECISION-route"]);
    }

    #[tokio::test]
    async fn branch_error_gets_dotted_diagnostic_path() {
        let failing: Box<dyn Executable> = Box::new(Step::new("inner", |_state, _agent| {
            Box::pin(async move { Err(anyhow::anyhow!("timeout")) })
        }));
        let mut table = BranchTable::new();
        table.insert("go".into(), vec![failing]);

        let decision = Decision::new(
            "route",
            |_state, _agent| Box::pin(async move { Ok("go".to_string()) }),
            table,
        );

        let mut cx = context();
        let err = decision
            .execute(&mut cx)
            .await
            .expect_err("decision should fail");

        assert_eq!(err.trail(), ["DECISION-route", "STEP-inner"]);
        assert_eq!(err.to_string(), "DECISION-route > STEP-inner: timeout");
    }
}
