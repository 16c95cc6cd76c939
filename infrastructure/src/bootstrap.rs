//! Engine context: the host-owned wiring of catalog, directory, plans and
//! executor.
//!
//! One [`EngineContext`] is built per process (usually from a
//! [`FileConfig`]) and passed to the entry points that need it. It exposes
//! the administrative surface:
//!
//! | Concern | Operations |
//! |---------|------------|
//! | Tools | register, unregister, discover from a source |
//! | Agents | register, unregister, route |
//! | Plans | load, add, compose, validate, compile |
//! | Runs | execute, execute with progress |
//!
//! ```text
//! FileConfig ──▶ EngineContext::from_config ──▶ (EngineContext, BootReport)
//!                   ├─ ToolCatalog      ◀─ builtin_source + ManifestToolSource
//!                   ├─ AgentDirectory   ◀─ [[agents]]
//!                   ├─ PlanLibrary      ◀─ [plans] dirs
//!                   └─ ExecutePlanUseCase (ExecutorConfig + installer)
//! ```

use crate::config::{ConfigIssue, FileConfig};
use crate::installer::ShellDependencyInstaller;
use crate::plans::{PlanLoadError, load_plan_dirs, load_plan_file};
use crate::tools::{
    DiscoveryReport, ManifestToolSource, RegisterOutcome, ToolCatalog, ToolSource, builtin_source,
};
use mender_application::{
    AgentDirectory, DependencyInstaller, ExecutePlanUseCase, ExecutionProgressNotifier,
    ExecutorConfig, NoInstaller, RankedAgent, RoutingError, ToolCatalogPort,
};
use mender_domain::{
    AgentProfile, DomainError, ExecutionResult, Plan, PlanFormat, PlanIssue, PlanLibrary, Tool,
    ToolArgs, compile,
};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// What happened while building an [`EngineContext`] from configuration.
#[derive(Debug, Default)]
pub struct BootReport {
    pub config_issues: Vec<ConfigIssue>,
    pub discovery: Vec<DiscoveryReport>,
    pub plan_errors: Vec<PlanLoadError>,
}

impl BootReport {
    /// Number of discovery entries that were skipped.
    pub fn skipped_tools(&self) -> usize {
        self.discovery.iter().map(|r| r.skipped.len()).sum()
    }
}

/// Process-wide engine state.
pub struct EngineContext {
    catalog: Arc<RwLock<ToolCatalog>>,
    agents: AgentDirectory,
    plans: PlanLibrary,
    executor: ExecutePlanUseCase<RwLock<ToolCatalog>>,
}

impl EngineContext {
    /// Empty catalog, directory and library with the given executor defaults.
    pub fn new(config: ExecutorConfig) -> Self {
        let catalog = Arc::new(RwLock::new(ToolCatalog::new()));
        let executor = ExecutePlanUseCase::new(catalog.clone()).with_config(config);
        Self {
            catalog,
            agents: AgentDirectory::new(),
            plans: PlanLibrary::new(),
            executor,
        }
    }

    /// Build the whole engine from file configuration.
    ///
    /// Never fails: configuration issues, skipped tools and unreadable plans
    /// are collected in the [`BootReport`].
    pub fn from_config(config: &FileConfig) -> (Self, BootReport) {
        let mut report = BootReport {
            config_issues: config.validate(),
            ..Default::default()
        };

        let (executor_config, _) = config.executor_config();
        let mut engine = Self::new(executor_config);

        let installer: Arc<dyn DependencyInstaller> = if config.installer.enabled {
            let mut shell = ShellDependencyInstaller::new(&config.installer.command);
            if let Some(dir) = &config.installer.working_dir {
                shell = shell.with_working_dir(dir);
            }
            Arc::new(shell)
        } else {
            Arc::new(NoInstaller)
        };
        engine = engine.with_installer(installer);

        if config.tools.builtin {
            report.discovery.push(engine.discover_tools(&builtin_source()));
        }
        let manifest_dirs = config.tools.resolved_manifest_dirs();
        if !manifest_dirs.is_empty() {
            report
                .discovery
                .push(engine.discover_tools(&ManifestToolSource::new(manifest_dirs)));
        }

        for profile in config.agent_profiles().0 {
            engine.register_agent(profile);
        }

        let plan_report = load_plan_dirs(&mut engine.plans, &config.plans.resolved_dirs());
        report.plan_errors = plan_report.errors;

        info!(
            tools = engine.catalog_read().len(),
            agents = engine.agents.len(),
            plans = engine.plans.len(),
            issues = report.config_issues.len(),
            "Engine ready"
        );
        (engine, report)
    }

    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.executor = self.executor.with_installer(installer);
        self
    }

    // ==================== Tools ====================

    /// Shared catalog handle, for hosts that run plans elsewhere.
    pub fn catalog(&self) -> &Arc<RwLock<ToolCatalog>> {
        &self.catalog
    }

    /// Read access to the catalog. A poisoned lock is recovered.
    pub fn catalog_read(&self) -> RwLockReadGuard<'_, ToolCatalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn catalog_write(&self) -> RwLockWriteGuard<'_, ToolCatalog> {
        self.catalog.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register_tool(&self, tool: Tool) -> RegisterOutcome {
        self.catalog_write().register(tool)
    }

    pub fn unregister_tool(&self, name: &str) -> Option<Tool> {
        self.catalog_write().unregister(name)
    }

    pub fn discover_tools(&self, source: &dyn ToolSource) -> DiscoveryReport {
        self.catalog_write().discover(source)
    }

    // ==================== Agents ====================

    pub fn agents(&self) -> &AgentDirectory {
        &self.agents
    }

    pub fn register_agent(&mut self, profile: AgentProfile) -> Option<AgentProfile> {
        self.agents.register(profile)
    }

    pub fn unregister_agent(&mut self, name: &str) -> Option<AgentProfile> {
        self.agents.unregister(name)
    }

    /// Best profile for the plan plus up to `fallbacks` alternatives.
    pub fn route(&self, plan: &Plan, fallbacks: usize) -> Result<Vec<RankedAgent>, RoutingError> {
        let requirements = AgentDirectory::requirements(plan, self.catalog.as_ref());
        self.agents.route(&requirements, fallbacks)
    }

    // ==================== Plans ====================

    pub fn plans(&self) -> &PlanLibrary {
        &self.plans
    }

    /// Add a plan to the library, returning the one it replaced.
    pub fn add_plan(&mut self, plan: Plan) -> Option<Plan> {
        if let Some(previous) = self.plans.insert(plan) {
            warn!(plan = %previous.name, "Replaced plan in library");
            return Some(previous);
        }
        None
    }

    /// Load a plan file into the library and return its name.
    pub fn load_plan(&mut self, path: &Path) -> Result<String, PlanLoadError> {
        let plan = load_plan_file(path)?;
        let name = plan.name.clone();
        self.add_plan(plan);
        Ok(name)
    }

    /// Compose library plans by name.
    pub fn compose<S: AsRef<str>>(&self, names: &[S]) -> Result<Plan, DomainError> {
        self.plans.compose(names)
    }

    /// Check a plan against the tools currently registered.
    pub fn validate(&self, plan: &Plan) -> Vec<PlanIssue> {
        plan.validate(&self.catalog.tool_names())
    }

    /// Parse and validate plan text against the current catalog.
    pub fn compile(
        &self,
        text: &str,
        format: PlanFormat,
    ) -> Result<(Plan, Vec<PlanIssue>), DomainError> {
        compile(text, format, &self.catalog.tool_names())
    }

    // ==================== Runs ====================

    pub fn executor(&self) -> &ExecutePlanUseCase<RwLock<ToolCatalog>> {
        &self.executor
    }

    pub async fn execute(
        &self,
        plan: &Plan,
        profile: Option<&AgentProfile>,
        inputs: ToolArgs,
    ) -> ExecutionResult {
        self.executor.execute(plan, profile, inputs).await
    }

    pub async fn execute_with_progress(
        &self,
        plan: &Plan,
        profile: Option<&AgentProfile>,
        inputs: ToolArgs,
        progress: &dyn ExecutionProgressNotifier,
    ) -> ExecutionResult {
        self.executor
            .execute_with_progress(plan, profile, inputs, progress)
            .await
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
