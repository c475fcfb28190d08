//! Polymorphic executable-node contract

use async_trait::async_trait;

use crate::context::ExecContext;
use wayfarer_core_types::{ExecResult, NodeKind, StatePatch};

/// Common contract for every node in a module tree: atomic steps, sequential
/// groups, branches, and retry groups. Composites own their children as
/// boxed trait objects, forming a simple tree.
#[async_trait]
pub trait Executable: Send + Sync {
    /// Kind-tagged id, e.g. `STEP-login`.
    fn id(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// Run this node against the shared context. Leaf steps hand back the
    /// state patch their function produced; composites hand back `None`.
    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<Option<StatePatch>>;
}
