//! Named plan collection and plan composition.

use std::collections::BTreeMap;

use super::entities::{Plan, PlanStep};
use super::reference::{rewrite_references, rewrite_value_references};
use crate::core::error::DomainError;

/// Plans keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PlanLibrary {
    plans: BTreeMap<String, Plan>,
}

impl PlanLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a plan, returning the one it replaced.
    pub fn insert(&mut self, plan: Plan) -> Option<Plan> {
        self.plans.insert(plan.name.clone(), plan)
    }

    pub fn remove(&mut self, name: &str) -> Option<Plan> {
        self.plans.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Plan> {
        self.plans.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Merge the named plans, in order, into one plan.
    ///
    /// - step ids become `<plan>_<step>`, and `$<step>` references inside
    ///   each source plan are rewritten to match
    /// - constraints, tags and error handlers are unioned (first occurrence
    ///   wins for a handler category), inputs and outputs likewise
    /// - wall-clock and cost budgets are summed over the plans that set them
    pub fn compose<S: AsRef<str>>(&self, names: &[S]) -> Result<Plan, DomainError> {
        if names.is_empty() {
            return Err(DomainError::NothingToCompose);
        }

        let sources = names
            .iter()
            .map(|n| {
                self.get(n.as_ref())
                    .ok_or_else(|| DomainError::UnknownPlan(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = sources
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let mut composed = Plan::new(name).with_description(format!(
            "Composed from {}",
            sources
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        for source in sources {
            composed
                .steps
                .extend(source.steps.iter().map(|s| prefixed_step(source, s)));

            for constraint in &source.constraints {
                if !composed.constraints.contains(constraint) {
                    composed.constraints.push(constraint.clone());
                }
            }
            for tag in &source.tags {
                if !composed.tags.contains(tag) {
                    composed.tags.push(tag.clone());
                }
            }
            for handler in &source.error_handlers {
                if !composed
                    .error_handlers
                    .iter()
                    .any(|h| h.category == handler.category)
                {
                    composed.error_handlers.push(handler.clone());
                }
            }
            for (input, spec) in &source.inputs {
                composed
                    .inputs
                    .entry(input.clone())
                    .or_insert_with(|| spec.clone());
            }
            for (output, value) in &source.outputs {
                composed
                    .outputs
                    .entry(output.clone())
                    .or_insert_with(|| value.clone());
            }

            composed.timeout_seconds = sum_budget(composed.timeout_seconds, source.timeout_seconds);
            composed.cost_budget_usd = sum_budget(composed.cost_budget_usd, source.cost_budget_usd);
        }

        Ok(composed)
    }
}

fn sum_budget(total: Option<f64>, next: Option<f64>) -> Option<f64> {
    match (total, next) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}

fn prefixed_step(source: &Plan, step: &PlanStep) -> PlanStep {
    let prefix = |id: &str| format!("{}_{}", source.name, id);
    let rename = |root: &str| source.step(root).map(|s| prefix(&s.id));

    let mut renamed = step.clone();
    renamed.id = prefix(&step.id);
    renamed.inputs = step
        .inputs
        .iter()
        .map(|(k, v)| (k.clone(), rewrite_value_references(v, &rename)))
        .collect();
    renamed.input_mappings = step
        .input_mappings
        .iter()
        .map(|(k, v)| (k.clone(), rewrite_references(v, &rename)))
        .collect();
    renamed.condition = step
        .condition
        .as_deref()
        .map(|c| rewrite_references(c, &rename));
    renamed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entities::InputSpec;
    use std::collections::BTreeSet;

    fn library() -> PlanLibrary {
        let mut library = PlanLibrary::new();
        library.insert(
            Plan::new("wfA")
                .with_input("region", InputSpec::new("string"))
                .with_constraint("stay in budget")
                .with_cost_budget(1.0)
                .with_step(PlanStep::new("fetch", "http_get"))
                .with_step(
                    PlanStep::new("store", "write_blob")
                        .with_input("body", "$fetch.body")
                        .with_condition("$fetch.status == 'ok'"),
                ),
        );
        library.insert(
            Plan::new("wfB")
                .with_constraint("stay in budget")
                .with_cost_budget(0.5)
                .with_step(PlanStep::new("notify", "send_slack").with_mapping("text", "$prev.url")),
        );
        library
    }

    #[test]
    fn test_compose_prefixes_and_unions() {
        let plan = library().compose(&["wfA", "wfB"]).unwrap();

        assert_eq!(plan.step_ids(), vec!["wfA_fetch", "wfA_store", "wfB_notify"]);
        let expected: BTreeSet<String> = ["http_get", "write_blob", "send_slack"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(plan.required_tools(), expected);
        assert_eq!(plan.constraints, vec!["stay in budget"]);
        assert!(plan.inputs.contains_key("region"));
        assert_eq!(plan.cost_budget_usd, Some(1.5));
    }

    #[test]
    fn test_compose_rewrites_step_references() {
        let plan = library().compose(&["wfA", "wfB"]).unwrap();
        let store = plan.step("wfA_store").unwrap();

        assert_eq!(store.inputs["body"], "$wfA_fetch.body");
        assert_eq!(store.condition.as_deref(), Some("$wfA_fetch.status == 'ok'"));
        assert_eq!(plan.step("wfB_notify").unwrap().input_mappings["text"], "$prev.url");

        let tools: BTreeSet<String> = plan.required_tools();
        assert!(!Plan::has_errors(&plan.validate(&tools)));
    }

    #[test]
    fn test_compose_unknown_plan() {
        let result = library().compose(&["wfA", "nope"]);
        assert!(matches!(result, Err(DomainError::UnknownPlan(name)) if name == "nope"));
        assert!(matches!(
            library().compose::<&str>(&[]),
            Err(DomainError::NothingToCompose)
        ));
    }
}
