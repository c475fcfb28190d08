//! Logger collaborator and nesting-aware log helpers

use std::sync::Arc;

/// Two-method logging sink configured per node. Absence is a no-op.
pub trait FlowLogger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Stock [`FlowLogger`] forwarding to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl FlowLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "wayfarer", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "wayfarer", "{}", message);
    }
}

/// Four spaces per nesting level, prefixed to every message.
fn indent(level: u32) -> String {
    "    ".repeat(level as usize)
}

pub(crate) fn log_info(logger: &Option<Arc<dyn FlowLogger>>, level: u32, message: &str) {
    if let Some(logger) = logger {
        logger.info(&format!("{}{}", indent(level), message));
    }
}

pub(crate) fn log_error(logger: &Option<Arc<dyn FlowLogger>>, level: u32, message: &str) {
    if let Some(logger) = logger {
        logger.error(&format!("{}{}", indent(level), message));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_is_four_spaces_per_level() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn helpers_tolerate_missing_logger() {
        log_info(&None, 3, "nobody listening");
        log_error(&None, 3, "still nobody");
    }

    #[test]
    fn recording_logger_captures_indented_lines() {
        let logger = testing::RecordingLogger::shared();
        let slot: Option<Arc<dyn FlowLogger>> = Some(logger.clone());

        log_info(&slot, 1, "Step 'STEP-a' starting.");
        log_error(&slot, 0, "No actions found for key 'x'.");

        assert_eq!(logger.infos(), vec!["    Step 'STEP-a' starting."]);
        assert_eq!(logger.errors(), vec!["No actions found for key 'x'."]);
    }
}
