//! Tool domain traits
//!
//! Contains pure domain logic for checking resolved arguments against a
//! tool's declared inputs. The executor runs this before every invocation,
//! so a bad argument surfaces as a validation-classified failure.

use super::entities::ToolDefinition;
use super::handler::ToolArgs;

/// Validator for tool arguments
pub trait ToolValidator {
    /// Validate arguments against a definition
    fn validate(&self, args: &ToolArgs, definition: &ToolDefinition) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Required inputs must be present and non-null. Undeclared arguments are
/// rejected only when the tool declares at least one input; tools with an
/// empty input list accept anything.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, args: &ToolArgs, definition: &ToolDefinition) -> Result<(), String> {
        for input in &definition.inputs {
            let present = args.get(&input.name).is_some_and(|v| !v.is_null());
            if input.required && !present {
                return Err(format!(
                    "Missing required input '{}' for tool '{}'",
                    input.name, definition.name
                ));
            }
        }

        if definition.inputs.is_empty() {
            return Ok(());
        }

        for arg_name in args.keys() {
            if definition.input(arg_name).is_none() {
                return Err(format!(
                    "Unknown input '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            }
        }

        Ok(())
    }
}

/// Fill in declared defaults for inputs the caller left out (or set to null).
pub fn apply_input_defaults(args: &mut ToolArgs, definition: &ToolDefinition) {
    for input in &definition.inputs {
        let Some(default) = &input.default else {
            continue;
        };
        let missing = args.get(&input.name).is_none_or(|v| v.is_null());
        if missing {
            args.insert(input.name.clone(), default.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ToolCategory, ToolInput};
    use serde_json::json;

    fn definition() -> ToolDefinition {
        ToolDefinition::new("notify", "Send a notification", ToolCategory::Communication)
            .with_input(ToolInput::new("channel", "Target channel", true))
            .with_input(ToolInput::new("priority", "Priority", false).with_default("normal"))
    }

    fn args(pairs: &[(&str, serde_json::Value)]) -> ToolArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_validator_missing_required() {
        let result = DefaultToolValidator.validate(&ToolArgs::new(), &definition());
        assert!(result.unwrap_err().contains("Missing required input 'channel'"));
    }

    #[test]
    fn test_validator_null_counts_as_missing() {
        let result =
            DefaultToolValidator.validate(&args(&[("channel", json!(null))]), &definition());
        assert!(result.is_err());
    }

    #[test]
    fn test_validator_unknown_input() {
        let result = DefaultToolValidator.validate(
            &args(&[("channel", json!("#ops")), ("colour", json!("red"))]),
            &definition(),
        );
        assert!(result.unwrap_err().contains("Unknown input 'colour'"));
    }

    #[test]
    fn test_validator_accepts_anything_without_declared_inputs() {
        let open = ToolDefinition::new("echo", "Echo", ToolCategory::General);
        let result = DefaultToolValidator.validate(&args(&[("x", json!(1))]), &open);
        assert!(result.is_ok());
    }

    #[test]
    fn test_apply_defaults_fills_missing_only() {
        let mut provided = args(&[("channel", json!("#ops"))]);
        apply_input_defaults(&mut provided, &definition());
        assert_eq!(provided["priority"], json!("normal"));

        let mut explicit = args(&[("channel", json!("#ops")), ("priority", json!("high"))]);
        apply_input_defaults(&mut explicit, &definition());
        assert_eq!(explicit["priority"], json!("high"));
    }
}
