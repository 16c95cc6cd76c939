//! CLI entrypoint for mender
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod output;
mod progress;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use commands::{
    Cli, Command, ComposeArgs, ConfigArgs, OutputFormat, RouteArgs, RunArgs, ToolsArgs,
    ValidateArgs,
};
use mender_application::{CompositeProgressNotifier, ExecutionProgressNotifier};
use mender_domain::{AgentProfile, Plan, Severity, ToolArgs, ToolCategory, ToolDefinition};
use mender_infrastructure::{
    BootReport, ConfigLoader, EngineContext, FileConfig, JsonlRunLogger, load_plan_file,
};
use output::ConsoleFormatter;
use progress::ConsoleProgress;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let _log_guard = init_logging(cli.verbose, &config);
    info!("Starting mender");

    if let Command::Config(args) = &cli.command {
        return show_config(args, &cli, &config);
    }

    // === Dependency Injection ===
    let (mut engine, report) = EngineContext::from_config(&config);
    print_boot_report(&report);

    match cli.command {
        Command::Tools(args) => list_tools(&engine, &args),
        Command::Validate(args) => validate(&mut engine, &args),
        Command::Route(args) => route(&mut engine, &args),
        Command::Run(args) => run(&mut engine, &config, &args).await,
        Command::Compose(args) => compose(&mut engine, &args),
        Command::Config(_) => Ok(()),
    }
}

/// Console layer filtered by `-v` (or `RUST_LOG`), plus a daily-rolling
/// file layer when `[logging] dir` is set.
fn init_logging(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let console_filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file, guard) = match config.logging.resolved_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mender.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
    guard
}

fn print_boot_report(report: &BootReport) {
    for issue in &report.config_issues {
        let label = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        eprintln!("{} {}: {}", "config".dimmed(), label, issue.message);
    }
    for error in &report.plan_errors {
        eprintln!("{} {}", "warning:".yellow().bold(), error);
    }
    let skipped = report.skipped_tools();
    if skipped > 0 {
        warn!("{} tool definitions skipped during discovery", skipped);
    }
}

/// Resolve a plan argument: an existing file is loaded and added to the
/// library, anything else is looked up by name.
fn resolve_plan(engine: &mut EngineContext, reference: &str) -> Result<Plan> {
    let path = Path::new(reference);
    if path.is_file() {
        let plan = load_plan_file(path)?;
        engine.add_plan(plan.clone());
        return Ok(plan);
    }
    match engine.plans().get(reference) {
        Some(plan) => Ok(plan.clone()),
        None => bail!(
            "No plan file or library plan named '{}' ({} plans loaded)",
            reference,
            engine.plans().len()
        ),
    }
}

/// Parse `NAME=VALUE` pairs; values are JSON when they parse, strings otherwise.
fn parse_inputs(pairs: &[String]) -> Result<ToolArgs> {
    let mut inputs = ToolArgs::new();
    for pair in pairs {
        let Some((name, raw)) = pair.split_once('=') else {
            bail!("Invalid input '{}': expected NAME=VALUE", pair);
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid input '{}': empty name", pair);
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        inputs.insert(name.to_string(), value);
    }
    Ok(inputs)
}

fn list_tools(engine: &EngineContext, args: &ToolsArgs) -> Result<()> {
    let category = match &args.category {
        Some(raw) => Some(raw.parse::<ToolCategory>().map_err(anyhow::Error::msg)?),
        None => None,
    };

    let catalog = engine.catalog_read();
    let mut tools: Vec<_> = catalog
        .search(args.query.as_deref().unwrap_or(""), category, &args.tags)
        .into_iter()
        .cloned()
        .collect();
    tools.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));

    match args.output {
        OutputFormat::Text => print!("{}", ConsoleFormatter::tools(&tools)),
        OutputFormat::Json => {
            let definitions: Vec<&ToolDefinition> = tools.iter().map(|t| &t.definition).collect();
            println!("{}", serde_json::to_string_pretty(&definitions)?);
        }
    }
    Ok(())
}

fn validate(engine: &mut EngineContext, args: &ValidateArgs) -> Result<()> {
    let plan = resolve_plan(engine, &args.plan)?;
    let issues = engine.validate(&plan);
    if issues.is_empty() {
        println!("{} {} ({} steps)", "v".green(), plan.name.bold(), plan.steps.len());
        return Ok(());
    }

    print!("{}", ConsoleFormatter::issues(&issues));
    let errors = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("Plan '{}' has {} error(s)", plan.name, errors);
    }
    Ok(())
}

fn route(engine: &mut EngineContext, args: &RouteArgs) -> Result<()> {
    let plan = resolve_plan(engine, &args.plan)?;
    let ranked = engine.route(&plan, args.fallbacks)?;
    print!("{}", ConsoleFormatter::route(&ranked));
    Ok(())
}

/// Pick the profile a run executes as: explicit `--agent`, none with
/// `--no-route`, otherwise the best-ranked profile when any are registered.
fn select_agent(
    engine: &EngineContext,
    plan: &Plan,
    args: &RunArgs,
) -> Result<Option<AgentProfile>> {
    if let Some(name) = &args.agent {
        return match engine.agents().get(name) {
            Some(profile) => Ok(Some(profile.clone())),
            None => bail!("Unknown agent profile '{}'", name),
        };
    }
    if args.no_route || engine.agents().is_empty() {
        return Ok(None);
    }
    let ranked = engine.route(plan, 0)?;
    Ok(ranked.into_iter().next().map(|r| r.profile))
}

async fn run(engine: &mut EngineContext, config: &FileConfig, args: &RunArgs) -> Result<()> {
    let plan = resolve_plan(engine, &args.plan)?;
    let inputs = parse_inputs(&args.inputs)?;
    let agent = select_agent(engine, &plan, args)?;

    let run_log_path: Option<PathBuf> = args
        .run_log
        .clone()
        .or_else(|| config.logging.resolved_run_log());
    let run_log = run_log_path.as_deref().and_then(JsonlRunLogger::new);
    if let (Some(path), None) = (&run_log_path, &run_log) {
        warn!("Run log {} is not writable; continuing without it", path.display());
    }

    let console = ConsoleProgress;
    let mut progress = CompositeProgressNotifier::new(Vec::new());
    if !args.quiet {
        progress.push(&console);
    }
    if let Some(logger) = &run_log {
        progress.push(logger as &dyn ExecutionProgressNotifier);
    }

    let result = engine
        .execute_with_progress(&plan, agent.as_ref(), inputs, &progress)
        .await;

    match args.output {
        OutputFormat::Text => print!("{}", ConsoleFormatter::result(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !result.is_success() {
        bail!(
            "Plan '{}' failed: {}",
            plan.name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn compose(engine: &mut EngineContext, args: &ComposeArgs) -> Result<()> {
    for file in &args.files {
        engine
            .load_plan(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;
    }
    let plan = engine.compose(&args.plans)?;
    let json = plan.to_json()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} {} ({} steps) -> {}",
                "v".green(),
                plan.name.bold(),
                plan.steps.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn show_config(args: &ConfigArgs, cli: &Cli, config: &FileConfig) -> Result<()> {
    println!("{}", "Configuration files:".bold());
    if cli.no_config {
        println!("  (disabled by --no-config)");
    } else {
        for (label, path, exists) in ConfigLoader::config_sources(cli.config.as_ref()) {
            let mark = if exists { "v".green() } else { "-".dimmed() };
            println!("  {} {:8} {}", mark, label, path.display());
        }
    }
    println!(
        "  {} environment: {}*",
        "+".cyan(),
        mender_infrastructure::config::ENV_PREFIX
    );
    if args.sources {
        return Ok(());
    }

    println!();
    println!("{}", "Merged configuration:".bold());
    println!("{}", toml::to_string_pretty(config)?);

    let issues = config.validate();
    if issues.is_empty() {
        println!("{} no issues", "v".green());
    }
    for issue in &issues {
        let label = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!("{}: {}", label, issue.message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_inputs_json_and_string() {
        let inputs = parse_inputs(&[
            "service=api".to_string(),
            "replicas=3".to_string(),
            "flags={\"dry\":true}".to_string(),
        ])
        .unwrap();
        assert_eq!(inputs["service"], json!("api"));
        assert_eq!(inputs["replicas"], json!(3));
        assert_eq!(inputs["flags"], json!({"dry": true}));
    }

    #[test]
    fn test_parse_inputs_rejects_missing_equals() {
        assert!(parse_inputs(&["service".to_string()]).is_err());
        assert!(parse_inputs(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_plan_by_name() {
        let mut engine = EngineContext::default();
        engine.add_plan(Plan::new("deploy"));
        assert_eq!(resolve_plan(&mut engine, "deploy").unwrap().name, "deploy");
        assert!(resolve_plan(&mut engine, "missing").is_err());
    }
}
