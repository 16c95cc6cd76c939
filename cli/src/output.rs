//! Console output formatting

use colored::Colorize;
use mender_application::RankedAgent;
use mender_domain::{ExecutionResult, PlanIssue, Severity, StepStatus, Tool};

/// Formats engine results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn tools(tools: &[Tool]) -> String {
        if tools.is_empty() {
            return "No tools found.\n".to_string();
        }
        let width = tools
            .iter()
            .map(|t| t.definition.name.len())
            .max()
            .unwrap_or(0);

        let mut output = String::new();
        for tool in tools {
            let def = &tool.definition;
            output.push_str(&format!(
                "{:width$}  {:13}  {}\n",
                def.name.bold(),
                def.category.as_str().cyan(),
                def.description,
                width = width
            ));
            let inputs: Vec<String> = def
                .inputs
                .iter()
                .map(|i| {
                    if i.required {
                        i.name.clone()
                    } else {
                        format!("[{}]", i.name)
                    }
                })
                .collect();
            if !inputs.is_empty() {
                output.push_str(&format!(
                    "{:width$}  inputs: {}\n",
                    "",
                    inputs.join(", ").dimmed(),
                    width = width
                ));
            }
        }
        output
    }

    pub fn issues(issues: &[PlanIssue]) -> String {
        let mut output = String::new();
        for issue in issues {
            let label = match issue.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warning => "warning".yellow().bold(),
            };
            output.push_str(&format!("{}: {}\n", label, issue.message));
        }
        output
    }

    pub fn route(route: &[RankedAgent]) -> String {
        let mut output = String::new();
        for (index, ranked) in route.iter().enumerate() {
            let role = if index == 0 { "primary " } else { "fallback" };
            output.push_str(&format!(
                "{}  {:.3}  {} ({})\n",
                role.cyan(),
                ranked.score,
                ranked.profile.name.bold(),
                ranked.profile.domain
            ));
        }
        output
    }

    pub fn result(result: &ExecutionResult) -> String {
        let mut output = String::new();
        let status = if result.is_success() {
            result.status.as_str().green().bold()
        } else {
            result.status.as_str().red().bold()
        };
        output.push_str(&format!("{} {}\n", result.workflow_name.bold(), status));

        for step in &result.step_results {
            let line = format!(
                "  {:20} {:8} {:>6} ms  retries {}",
                step.step_id, step.status, step.duration_ms, step.retries
            );
            let line = match step.status {
                StepStatus::Success => line.normal(),
                StepStatus::Skipped => line.yellow(),
                _ => line.red(),
            };
            output.push_str(&format!("{}\n", line));
            if let Some(error) = &step.error {
                let category = step.error_type.map(|c| c.as_str().to_string());
                output.push_str(&format!(
                    "      {} [{}]\n",
                    error,
                    category.as_deref().unwrap_or("-")
                ));
            }
            for record in &step.recovery {
                output.push_str(&format!(
                    "      {} attempt {}: {} after {}\n",
                    "~".cyan(),
                    record.attempt,
                    record.action,
                    record.category
                ));
            }
            if let Some(fallback) = &step.fallback_tool {
                output.push_str(&format!("      fallback tool: {}\n", fallback));
            }
        }

        if let Some(error) = &result.error {
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
        }
        output.push_str(&format!(
            "{} {} ms, {} retries, ${:.4}, {} tokens\n",
            "Totals:".cyan(),
            result.total_duration_ms,
            result.total_retries,
            result.total_cost_usd,
            result.total_tokens
        ));
        if let Some(value) = &result.output {
            output.push_str(&format!("{} {}\n", "Output:".cyan(), value));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_domain::{ErrorCategory, StepResult};

    #[test]
    fn test_result_lists_failed_step_error() {
        colored::control::set_override(false);
        let plan = mender_domain::Plan::new("deploy");
        let mut ctx = mender_domain::ExecutionContext::new(&plan, None, Default::default());
        ctx.record(
            StepResult::new("push", "deploy_service", StepStatus::Failed)
                .with_error("ConnectionError: refused", ErrorCategory::Network),
        );
        let result = ctx.finish(Some("Step 'push' failed".to_string()));

        let text = ConsoleFormatter::result(&result);
        assert!(text.contains("deploy failed"));
        assert!(text.contains("ConnectionError: refused [network]"));
        assert!(text.contains("Error: Step 'push' failed"));
    }
}
