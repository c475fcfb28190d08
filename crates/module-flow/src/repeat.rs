//! Bounded retry group node

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use wayfarer_core_types::{ExecResult, NodeKind, StatePatch};

use crate::context::ExecContext;
use crate::logging::{log_error, log_info, FlowLogger};
use crate::node::Executable;

/// Attempts allowed before the last error is rethrown.
pub const DEFAULT_ATTEMPT_LIMIT: u32 = 3;

// Retries wait at most this long, whatever the configured base.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Group of nodes rerun as a whole on failure, up to an attempt limit.
///
/// Retrying happens while attempts-so-far stay below the limit, so a group
/// with limit 3 runs at most exactly 3 times. Level bookkeeping happens once
/// around the whole retry loop, not per attempt.
pub struct Repeat {
    id: String,
    steps: Vec<Box<dyn Executable>>,
    limit: u32,
    backoff: Option<Duration>,
    logger: Option<Arc<dyn FlowLogger>>,
}

impl Repeat {
    pub fn new(id: &str, steps: Vec<Box<dyn Executable>>) -> Self {
        Self {
            id: NodeKind::Repeat.tagged(id),
            steps,
            limit: DEFAULT_ATTEMPT_LIMIT,
            backoff: None,
            logger: None,
        }
    }

    /// Override the attempt budget. A zero limit still runs the group once.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sleep `base * 2^(attempt-1)` between attempts, capped at 60 s.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff = Some(base);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    async fn run_group(&self, cx: &mut ExecContext) -> ExecResult<()> {
        for step in &self.steps {
            step.execute(cx).await?;
        }
        Ok(())
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let base_ms = base.as_millis() as u64;
    let total_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    Duration::from_millis(total_ms).min(MAX_BACKOFF)
}

#[async_trait]
impl Executable for Repeat {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Repeat
    }

    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<Option<StatePatch>> {
        cx.push_level();
        log_info(
            &self.logger,
            cx.level(),
            &format!("Repeat '{}' starting.", self.id),
        );

        let limit = self.limit.max(1);
        let mut attempt: u32 = 1;

        loop {
            match self.run_group(cx).await {
                Ok(()) => {
                    log_info(
                        &self.logger,
                        cx.level(),
                        &format!("Repeat '{}' ended.", self.id),
                    );
                    cx.pop_level();
                    return Ok(None);
                }
                Err(err) => {
                    log_error(
                        &self.logger,
                        cx.level(),
                        &format!("Repeat '{}' attempt {} failed.", self.id, attempt),
                    );
                    warn!(repeat = %self.id, attempt, error = %err, "attempt failed");

                    if attempt < limit {
                        if let Some(base) = self.backoff {
                            sleep(backoff_delay(base, attempt)).await;
                        }
                        attempt += 1;
                    } else {
                        // Budget consumed: the last error goes up unchanged.
                        return Err(err.push_ancestor(&self.id));
                    }
                }
            }
        }
    }
}
