//! Sequential group node

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use wayfarer_core_types::{ExecResult, NodeKind, StatePatch};

use crate::context::ExecContext;
use crate::logging::{log_info, FlowLogger};
use crate::node::Executable;

/// Ordered group of nodes run strictly in sequence under one nesting level.
///
/// Child return values are not merged here; only nodes that mutate the
/// context directly have effect below the top level.
pub struct Action {
    id: String,
    steps: Vec<Box<dyn Executable>>,
    logger: Option<Arc<dyn FlowLogger>>,
}

impl Action {
    pub fn new(id: &str, steps: Vec<Box<dyn Executable>>) -> Self {
        Self {
            id: NodeKind::Action.tagged(id),
            steps,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

#[async_trait]
impl Executable for Action {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<Option<StatePatch>> {
        cx.push_level();
        log_info(
            &self.logger,
            cx.level(),
            &format!("Action '{}' start.", self.id),
        );
        debug!(action = %self.id, steps = self.steps.len(), "executing action");

        for step in &self.steps {
            step.execute(cx)
                .await
                .map_err(|err| err.push_ancestor(&self.id))?;
        }

        log_info(
            &self.logger,
            cx.level(),
            &format!("Action '{}' end.", self.id),
        );
        cx.pop_level();

        Ok(None)
    }
}
