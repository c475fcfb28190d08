//! Top-level module orchestrator

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use agent_adapter::{
    AgentDriver, AgentHandle, AgentSession, ImageFormat, InterceptedRequest, LaunchOptions,
};
use wayfarer_core_types::{ExecError, ExecResult, ExecutionState, StatePatch};
use wayfarer_proxy_policy::ProxyPolicy;

use crate::context::ExecContext;
use crate::logging::{log_error, log_info, FlowLogger};
use crate::node::Executable;

/// Where the best-effort failure screenshot lands, relative to the working
/// directory.
pub const FAILURE_SCREENSHOT_PATH: &str = "tmp/screenshot.jpeg";

/// What a pre-setup hook hands back: a state patch to merge plus overrides
/// for the stored launch options.
#[derive(Default)]
pub struct PreSetupOutcome {
    pub state: StatePatch,
    pub launch_overrides: Option<LaunchOptions>,
}

/// Hook run before the agent is acquired.
pub type PreSetupFn =
    Box<dyn Fn(ExecutionState) -> BoxFuture<'static, anyhow::Result<PreSetupOutcome>> + Send + Sync>;

/// Hook run right after the agent is acquired.
pub type PostSetupFn = Box<
    dyn Fn(Arc<dyn AgentHandle>, ExecutionState) -> BoxFuture<'static, anyhow::Result<StatePatch>>
        + Send
        + Sync,
>;

/// Terminal hook receiving the final state.
pub type HookFn =
    Box<dyn Fn(ExecutionState) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Optional lifecycle hooks and launch options, supplied once at module
/// construction and never mutated afterwards. Pre-setup launch overrides are
/// merged into a per-run effective copy.
#[derive(Default)]
pub struct ModuleConfig {
    pub pre_setup: Option<PreSetupFn>,
    pub post_setup: Option<PostSetupFn>,
    pub launch_options: LaunchOptions,
    pub on_error: Option<HookFn>,
    pub on_success: Option<HookFn>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pre_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(ExecutionState) -> BoxFuture<'static, anyhow::Result<PreSetupOutcome>>
            + Send
            + Sync
            + 'static,
    {
        self.pre_setup = Some(Box::new(hook));
        self
    }

    pub fn with_post_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<dyn AgentHandle>, ExecutionState) -> BoxFuture<'static, anyhow::Result<StatePatch>>
            + Send
            + Sync
            + 'static,
    {
        self.post_setup = Some(Box::new(hook));
        self
    }

    pub fn with_launch_options(mut self, launch_options: LaunchOptions) -> Self {
        self.launch_options = launch_options;
        self
    }

    pub fn with_on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(ExecutionState) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub fn with_on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(ExecutionState) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }
}

/// Top-level orchestrator: owns state initialization, agent acquisition and
/// release, sequential top-level execution, and the error/success hooks.
///
/// `start` resolves with the run's result whatever happens inside — every
/// failure is caught, diagnosed, and fed to the error hook, and the agent
/// handle is released exactly once on every path.
pub struct Module {
    id: String,
    steps: Vec<Box<dyn Executable>>,
    driver: Arc<dyn AgentDriver>,
    config: ModuleConfig,
    initial_state: ExecutionState,
    proxy: Arc<ProxyPolicy>,
    logger: Option<Arc<dyn FlowLogger>>,
}

impl Module {
    pub fn new(id: &str, steps: Vec<Box<dyn Executable>>, driver: Arc<dyn AgentDriver>) -> Self {
        Self {
            id: id.to_string(),
            steps,
            driver,
            config: ModuleConfig::default(),
            initial_state: ExecutionState::default(),
            proxy: Arc::new(ProxyPolicy::from_env()),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn FlowLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Seed the state each run starts from. The execution flags are reset
    /// per run regardless of what the seed carries.
    pub fn with_initial_state(mut self, initial_state: ExecutionState) -> Self {
        self.initial_state = initial_state;
        self
    }

    pub fn with_config(mut self, config: ModuleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_proxy_policy(mut self, proxy: Arc<ProxyPolicy>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the module once. Resolves with a copy of `state.result`; never
    /// fails, whatever the run did.
    pub async fn start(&self, data: Value) -> Option<Value> {
        let run = Uuid::new_v4();
        let span = info_span!("module_run", module = %self.id, %run);
        self.start_inner(data).instrument(span).await
    }

    async fn start_inner(&self, data: Value) -> Option<Value> {
        let mut initial = self.initial_state.clone();
        initial.on_exec = false;
        initial.success = true;
        let mut cx = ExecContext::new(initial, Arc::clone(&self.proxy));

        log_info(
            &self.logger,
            cx.level(),
            &format!("Starting module '{}'.", self.id),
        );
        cx.update(
            StatePatch::new()
                .with_data(data)
                .with_started_at(Utc::now()),
        );

        if let Err(err) = self.run(&mut cx).await {
            cx.update(StatePatch::new().with_success(false));
            self.capture_failure_screenshot(&cx).await;

            if !cx.state().on_exec {
                log_error(
                    &self.logger,
                    cx.level(),
                    &format!("Module '{}' failed to START.", self.id),
                );
            } else {
                log_error(
                    &self.logger,
                    cx.level(),
                    &format!("Module '{}' failed to EXECUTE.", self.id),
                );
                let ongoing = cx.state().ongoing_step.clone().unwrap_or_default();
                log_error(
                    &self.logger,
                    cx.level(),
                    &format!("Error on step: {}.", ongoing),
                );
            }
            log_error(&self.logger, cx.level(), &format!("Error: {}.", err));
            tracing::error!(module = %self.id, error = %err, "module run failed");

            if let Some(hook) = &self.config.on_error {
                if let Err(hook_err) = hook(cx.state().clone()).await {
                    log_error(
                        &self.logger,
                        cx.level(),
                        &format!("on_error hook failed: {}.", hook_err),
                    );
                }
            }
        }

        // Teardown always runs and releases the handle exactly once.
        if let Some(agent) = cx.take_agent() {
            if let Err(close_err) = agent.close().await {
                log_error(
                    &self.logger,
                    cx.level(),
                    &format!("Failed to close agent: {}.", close_err),
                );
            }
        }

        if cx.state().success {
            if let Some(hook) = &self.config.on_success {
                if let Err(hook_err) = hook(cx.state().clone()).await {
                    log_error(
                        &self.logger,
                        cx.level(),
                        &format!("on_success hook failed: {}.", hook_err),
                    );
                }
            }
        }

        log_info(
            &self.logger,
            cx.level(),
            &format!("Module '{}' ended.", self.id),
        );
        cx.state().result.clone()
    }

    /// Setup and execution; any error here lands in `start`'s failure path.
    async fn run(&self, cx: &mut ExecContext) -> ExecResult<()> {
        let mut launch_options = self.config.launch_options.clone();

        if let Some(hook) = &self.config.pre_setup {
            log_info(&self.logger, cx.level(), "Executing pre-setup.");
            let outcome = hook(cx.state().clone()).await.map_err(ExecError::new)?;
            log_info(&self.logger, cx.level(), "Updating state.");
            cx.update(outcome.state);
            if let Some(overrides) = outcome.launch_overrides {
                launch_options = launch_options.merged(overrides);
            }
        }

        log_info(&self.logger, cx.level(), "Creating agent instance.");
        let agent = self
            .driver
            .launch(&launch_options)
            .await
            .map_err(|err| ExecError::new(err.into()))?;
        cx.set_agent(Arc::clone(&agent));
        self.install_request_routing(&agent);
        log_info(&self.logger, cx.level(), "DONE. Agent instance created.");

        if let Some(hook) = &self.config.post_setup {
            log_info(&self.logger, cx.level(), "Executing post-setup.");
            let patch = hook(Arc::clone(&agent), cx.state().clone())
                .await
                .map_err(ExecError::new)?;
            log_info(&self.logger, cx.level(), "Updating state.");
            cx.update(patch);
        }

        self.execute(cx).await
    }

    /// Every new session gets a request hook that reroutes through the proxy
    /// while the policy is enabled and passes through otherwise.
    fn install_request_routing(&self, agent: &Arc<dyn AgentHandle>) {
        let proxy = Arc::clone(&self.proxy);
        agent.on_new_session(Arc::new(move |session| {
            let proxy = Arc::clone(&proxy);
            session.on_request(Arc::new(move |request| {
                let proxy = Arc::clone(&proxy);
                Box::pin(async move {
                    if proxy.enabled() {
                        if let Err(err) = request.reroute(proxy.address()).await {
                            warn!(url = %request.url(), error = %err, "proxy reroute failed");
                        }
                    } else if let Err(err) = request.proceed().await {
                        warn!(url = %request.url(), error = %err, "request continue failed");
                    }
                })
            }));
        }));
    }

    /// Sequential top-level execution over the shared context.
    async fn execute(&self, cx: &mut ExecContext) -> ExecResult<()> {
        log_info(&self.logger, cx.level(), "Module execution starting.");
        cx.update(StatePatch::new().with_on_exec(true));

        for node in &self.steps {
            cx.update(StatePatch::new().with_ongoing_step(node.id()));
            debug!(step = %node.id(), "executing top-level node");
            if let Some(patch) = node.execute(cx).await? {
                cx.update(patch);
            }
        }

        Ok(())
    }

    /// Best-effort diagnostic screenshot of the first live session; its own
    /// failure is swallowed.
    async fn capture_failure_screenshot(&self, cx: &ExecContext) {
        let Some(agent) = cx.agent() else {
            return;
        };
        let sessions = agent.sessions().await;
        let Some(session) = sessions.first() else {
            return;
        };
        if let Err(err) = session
            .screenshot(Path::new(FAILURE_SCREENSHOT_PATH), ImageFormat::Jpeg)
            .await
        {
            debug!(error = %err, "failure screenshot could not be captured");
        }
    }
}
