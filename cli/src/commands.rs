//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON document
    Json,
}

/// CLI arguments for mender
#[derive(Parser, Debug)]
#[command(name = "mender")]
#[command(author, version, about = "Self-healing workflow execution engine")]
#[command(long_about = r#"
mender runs declarative plans (ordered tool invocations with data flowing
between steps) and recovers automatically from classified failures:
network hiccups are retried with backoff, missing modules are installed,
timeouts grow, unknown errors raise an alert.

Configuration files are loaded from (in priority order):
1. MENDER_* environment variables (e.g. MENDER_EXECUTOR__MAX_RETRIES=5)
2. --config <path>     Explicit config file
3. ./mender.toml       Project-level config
4. ~/.config/mender/config.toml   Global config

Example:
  mender tools --category workspace
  mender validate plans/deploy.toml
  mender run plans/deploy.toml --input service=api --input replicas=3
  mender compose build deploy > release.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List and search registered tools
    Tools(ToolsArgs),
    /// Parse and validate a plan against the tool catalog
    Validate(ValidateArgs),
    /// Rank agent profiles for a plan
    Route(RouteArgs),
    /// Execute a plan
    Run(RunArgs),
    /// Merge library plans into one
    Compose(ComposeArgs),
    /// Show the merged configuration and its issues
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Case-insensitive substring of name or description
    pub query: Option<String>,

    /// Only tools of this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Only tools carrying this tag (repeatable; all must match)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Plan file, or the name of a library plan
    pub plan: String,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Plan file, or the name of a library plan
    pub plan: String,

    /// Number of fallback profiles to list after the best one
    #[arg(short, long, default_value_t = 2)]
    pub fallbacks: usize,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Plan file, or the name of a library plan
    pub plan: String,

    /// Caller input as NAME=VALUE (VALUE parsed as JSON when possible)
    #[arg(short, long = "input", value_name = "NAME=VALUE")]
    pub inputs: Vec<String>,

    /// Run as this agent profile instead of routing
    #[arg(short, long)]
    pub agent: Option<String>,

    /// Run without an agent profile
    #[arg(long, conflicts_with = "agent")]
    pub no_route: bool,

    /// Append run events to this JSONL file (overrides [logging] run_log)
    #[arg(long, value_name = "PATH")]
    pub run_log: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Library plan names, in execution order
    #[arg(required = true)]
    pub plans: Vec<String>,

    /// Extra plan files to add to the library first
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Write the composed plan here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only list configuration file locations
    #[arg(long)]
    pub sources: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "mender", "-vv", "run", "deploy.toml", "-i", "service=api", "--input", "n=3",
            "--output", "json",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.plan, "deploy.toml");
                assert_eq!(args.inputs, vec!["service=api", "n=3"]);
                assert_eq!(args.output, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_agent_conflicts_with_no_route() {
        let result = Cli::try_parse_from(["mender", "run", "p", "--agent", "a", "--no-route"]);
        assert!(result.is_err());
    }
}
