//! Reference and condition mini-language.
//!
//! Step inputs and conditions may point at data produced earlier in the run:
//!
//! | Form | Resolves to |
//! |------|-------------|
//! | `$prev` / `$prev.a.b` | output of the previous executed step |
//! | `$inputs` / `$inputs.name` | caller inputs |
//! | `$<step_id>` / `$<step_id>.a.0` | output of a prior step (numeric segments index arrays) |
//! | `$$text` | the literal string `$text` |
//!
//! Conditions are a single operand (truthiness) or one `==` / `!=`
//! comparison between operands. Operands are references, quoted strings,
//! numbers, `true` / `false` / `null`, or a bare identifier naming a run
//! variable. There is no general expression evaluator: anything outside this
//! grammar is rejected at parse time.
//!
//! Unresolved references evaluate to `null`.

use serde_json::Value;

use crate::core::error::DomainError;
use crate::tool::handler::ToolArgs;

/// The sigil that starts a reference.
pub const SIGIL: char = '$';

/// What a reference is rooted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceRoot {
    Prev,
    Inputs,
    Step(String),
}

/// A parsed `$root.path` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub root: ReferenceRoot,
    pub path: Vec<String>,
}

impl Reference {
    /// Parse a whole string as a reference. The string must start with `$`.
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidReference(text.to_string());
        let body = text.strip_prefix(SIGIL).ok_or_else(invalid)?;
        let mut segments = body.split('.');

        let root = segments.next().ok_or_else(invalid)?;
        if !is_identifier(root) {
            return Err(invalid());
        }

        let mut path = Vec::new();
        for segment in segments {
            if segment.is_empty() || !segment.chars().all(is_identifier_char) {
                return Err(invalid());
            }
            path.push(segment.to_string());
        }

        let root = match root {
            "prev" => ReferenceRoot::Prev,
            "inputs" => ReferenceRoot::Inputs,
            step => ReferenceRoot::Step(step.to_string()),
        };
        Ok(Self { root, path })
    }

    /// The referenced step id, for `$<step_id>` references.
    pub fn step_id(&self) -> Option<&str> {
        match &self.root {
            ReferenceRoot::Step(id) => Some(id),
            _ => None,
        }
    }

    pub fn resolve(&self, scope: &dyn ReferenceScope) -> Option<Value> {
        match &self.root {
            ReferenceRoot::Prev => lookup_path(scope.previous_output()?, &self.path).cloned(),
            ReferenceRoot::Step(id) => lookup_path(scope.step_output(id)?, &self.path).cloned(),
            ReferenceRoot::Inputs => match self.path.split_first() {
                None => Some(Value::Object(scope.inputs().clone())),
                Some((name, rest)) => lookup_path(scope.inputs().get(name)?, rest).cloned(),
            },
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let root = match &self.root {
            ReferenceRoot::Prev => "prev",
            ReferenceRoot::Inputs => "inputs",
            ReferenceRoot::Step(id) => id.as_str(),
        };
        write!(f, "{}{}", SIGIL, root)?;
        for segment in &self.path {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Read access to the data a reference can point at.
pub trait ReferenceScope {
    fn previous_output(&self) -> Option<&Value>;
    fn inputs(&self) -> &ToolArgs;
    fn step_output(&self, step_id: &str) -> Option<&Value>;

    /// Run variable lookup for bare identifiers in conditions.
    fn variable(&self, _name: &str) -> Option<&Value> {
        None
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(is_identifier_char)
}

fn lookup_path<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Classification of a string value that may hold a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceText {
    /// Plain literal
    Literal,
    /// `$$...` escape; carries the unescaped text
    Escaped(String),
    Reference(Reference),
    /// Starts like a reference but does not parse as one
    Malformed,
}

/// Decide how a string input is treated at resolution time.
///
/// Strings like `$5.00` whose second character cannot start an identifier
/// stay literals rather than malformed references.
pub fn classify_text(text: &str) -> ReferenceText {
    let Some(rest) = text.strip_prefix(SIGIL) else {
        return ReferenceText::Literal;
    };
    if rest.starts_with(SIGIL) {
        return ReferenceText::Escaped(rest.to_string());
    }
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return ReferenceText::Literal;
    }
    match Reference::parse(text) {
        Ok(reference) => ReferenceText::Reference(reference),
        Err(_) => ReferenceText::Malformed,
    }
}

/// Resolve references inside a value, recursing into arrays and objects.
///
/// Unresolved and malformed references become `null`.
pub fn resolve_value(value: &Value, scope: &dyn ReferenceScope) -> Value {
    match value {
        Value::String(text) => match classify_text(text) {
            ReferenceText::Literal => value.clone(),
            ReferenceText::Escaped(unescaped) => Value::String(unescaped),
            ReferenceText::Reference(reference) => reference.resolve(scope).unwrap_or(Value::Null),
            ReferenceText::Malformed => Value::Null,
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, scope)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, scope)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Collect every reference-looking string inside a value.
pub fn find_references(value: &Value) -> Vec<(String, ReferenceText)> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<(String, ReferenceText)>) {
    match value {
        Value::String(text) => match classify_text(text) {
            ReferenceText::Literal | ReferenceText::Escaped(_) => {}
            classified => found.push((text.clone(), classified)),
        },
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

/// Rename the root of every `$root` occurrence in `text` for which `rename`
/// returns a new name. `$$` escapes are left untouched.
pub fn rewrite_references(text: &str, rename: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != SIGIL {
            out.push(c);
            continue;
        }
        if let Some(&(_, next)) = chars.peek()
            && next == SIGIL
        {
            out.push_str("$$");
            chars.next();
            continue;
        }

        let start = index + c.len_utf8();
        let mut end = start;
        while let Some(&(j, ch)) = chars.peek() {
            if !is_identifier_char(ch) {
                break;
            }
            end = j + ch.len_utf8();
            chars.next();
        }

        let root = &text[start..end];
        out.push(SIGIL);
        match rename(root) {
            Some(renamed) => out.push_str(&renamed),
            None => out.push_str(root),
        }
    }

    out
}

/// Rewrite references in every string of a value.
pub fn rewrite_value_references(value: &Value, rename: &dyn Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(text) if text.starts_with(SIGIL) => {
            Value::String(rewrite_references(text, rename))
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| rewrite_value_references(v, rename))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), rewrite_value_references(v, rename)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

// ==================== Conditions ====================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Reference(Reference),
    Literal(Value),
    Identifier(String),
    Eq,
    Ne,
}

/// Condition operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Variable(String),
    Reference(Reference),
}

impl Operand {
    fn evaluate(&self, scope: &dyn ReferenceScope) -> Value {
        match self {
            Operand::Literal(value) => value.clone(),
            Operand::Variable(name) => scope.variable(name).cloned().unwrap_or(Value::Null),
            Operand::Reference(reference) => reference.resolve(scope).unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
}

/// Parsed step condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Truthy(Operand),
    Compare {
        left: Operand,
        op: Comparison,
        right: Operand,
    },
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let invalid = |message: &str| DomainError::InvalidCondition {
            condition: text.to_string(),
            message: message.to_string(),
        };

        let mut tokens = tokenize(text).map_err(|m| invalid(&m))?.into_iter();
        let condition = match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
            (None, ..) => return Err(invalid("empty condition")),
            (Some(single), None, ..) => Condition::Truthy(operand(single).ok_or_else(|| invalid("expected an operand"))?),
            (Some(left), Some(op), Some(right), None) => {
                let op = match op {
                    Token::Eq => Comparison::Eq,
                    Token::Ne => Comparison::Ne,
                    _ => return Err(invalid("expected '==' or '!='")),
                };
                Condition::Compare {
                    left: operand(left).ok_or_else(|| invalid("expected an operand before the operator"))?,
                    op,
                    right: operand(right).ok_or_else(|| invalid("expected an operand after the operator"))?,
                }
            }
            _ => return Err(invalid("expected a single operand or one comparison")),
        };
        Ok(condition)
    }

    pub fn evaluate(&self, scope: &dyn ReferenceScope) -> bool {
        match self {
            Condition::Truthy(operand) => is_truthy(&operand.evaluate(scope)),
            Condition::Compare { left, op, right } => {
                let equal = values_equal(&left.evaluate(scope), &right.evaluate(scope));
                match op {
                    Comparison::Eq => equal,
                    Comparison::Ne => !equal,
                }
            }
        }
    }

    pub fn references(&self) -> Vec<&Reference> {
        let operands: Vec<&Operand> = match self {
            Condition::Truthy(operand) => vec![operand],
            Condition::Compare { left, right, .. } => vec![left, right],
        };
        operands
            .into_iter()
            .filter_map(|o| match o {
                Operand::Reference(reference) => Some(reference),
                _ => None,
            })
            .collect()
    }
}

fn operand(token: Token) -> Option<Operand> {
    match token {
        Token::Reference(reference) => Some(Operand::Reference(reference)),
        Token::Literal(value) => Some(Operand::Literal(value)),
        Token::Identifier(name) => Some(Operand::Variable(name)),
        Token::Eq | Token::Ne => None,
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '=' | '!' => {
                if chars.get(i + 1) != Some(&'=') {
                    return Err(format!("unexpected '{}' at position {}", c, i));
                }
                tokens.push(if c == '=' { Token::Eq } else { Token::Ne });
                i += 2;
            }
            '\'' | '"' => {
                let mut literal = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".to_string()),
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                literal.push(escaped);
                            }
                            i += 2;
                        }
                        Some(&q) if q == c => {
                            i += 1;
                            break;
                        }
                        Some(&other) => {
                            literal.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Literal(Value::String(literal)));
            }
            SIGIL => {
                let start = i;
                i += 1;
                while i < chars.len() && (is_identifier_char(chars[i]) || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let reference = Reference::parse(&raw).map_err(|e| e.to_string())?;
                tokens.push(Token::Reference(reference));
            }
            _ if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let number = raw
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .ok_or_else(|| format!("invalid number '{}'", raw))?;
                tokens.push(Token::Literal(Value::Number(number)));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && is_identifier_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "true" | "True" => Token::Literal(Value::Bool(true)),
                    "false" | "False" => Token::Literal(Value::Bool(false)),
                    "null" | "None" => Token::Literal(Value::Null),
                    _ => Token::Identifier(word),
                });
            }
            _ => return Err(format!("unexpected '{}' at position {}", c, i)),
        }
    }

    Ok(tokens)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Scope {
        prev: Option<Value>,
        inputs: ToolArgs,
        steps: HashMap<String, Value>,
        variables: HashMap<String, Value>,
    }

    impl ReferenceScope for Scope {
        fn previous_output(&self) -> Option<&Value> {
            self.prev.as_ref()
        }

        fn inputs(&self) -> &ToolArgs {
            &self.inputs
        }

        fn step_output(&self, step_id: &str) -> Option<&Value> {
            self.steps.get(step_id)
        }

        fn variable(&self, name: &str) -> Option<&Value> {
            self.variables.get(name)
        }
    }

    fn scope() -> Scope {
        let mut scope = Scope::default();
        scope.prev = Some(json!({"items": [{"id": 7}], "count": 1}));
        scope.inputs.insert("region".to_string(), json!("eu-west-1"));
        scope.steps.insert("a".to_string(), json!({"status": "ok"}));
        scope.variables.insert("a_status".to_string(), json!("success"));
        scope
    }

    #[test]
    fn test_reference_parse() {
        let reference = Reference::parse("$fetch.body.items").unwrap();
        assert_eq!(reference.step_id(), Some("fetch"));
        assert_eq!(reference.path, vec!["body", "items"]);
        assert_eq!(reference.to_string(), "$fetch.body.items");

        assert_eq!(Reference::parse("$prev").unwrap().root, ReferenceRoot::Prev);
        assert!(Reference::parse("$a..b").is_err());
        assert!(Reference::parse("$1abc").is_err());
        assert!(Reference::parse("prev").is_err());
    }

    #[test]
    fn test_resolve_paths_and_array_indexes() {
        let scope = scope();
        assert_eq!(
            resolve_value(&json!("$prev.items.0.id"), &scope),
            json!(7)
        );
        assert_eq!(resolve_value(&json!("$inputs.region"), &scope), json!("eu-west-1"));
        assert_eq!(resolve_value(&json!("$a"), &scope), json!({"status": "ok"}));
        assert_eq!(resolve_value(&json!("$missing.field"), &scope), Value::Null);
    }

    #[test]
    fn test_resolve_recurses_and_keeps_literals() {
        let scope = scope();
        let resolved = resolve_value(
            &json!({"target": "$a.status", "list": ["$inputs.region", 3], "price": "$5.00", "raw": "$$prev"}),
            &scope,
        );
        assert_eq!(
            resolved,
            json!({"target": "ok", "list": ["eu-west-1", 3], "price": "$5.00", "raw": "$prev"})
        );
    }

    #[test]
    fn test_condition_equality() {
        let scope = scope();
        assert!(Condition::parse("$a.status == 'ok'").unwrap().evaluate(&scope));
        assert!(!Condition::parse("$a.status == 'fail'").unwrap().evaluate(&scope));
        assert!(Condition::parse("$a.status != \"fail\"").unwrap().evaluate(&scope));
        assert!(Condition::parse("$prev.count == 1.0").unwrap().evaluate(&scope));
    }

    #[test]
    fn test_condition_truthiness_and_variables() {
        let scope = scope();
        assert!(Condition::parse("$prev.items").unwrap().evaluate(&scope));
        assert!(!Condition::parse("$nothing").unwrap().evaluate(&scope));
        assert!(Condition::parse("a_status == 'success'").unwrap().evaluate(&scope));
        assert!(Condition::parse("$missing == null").unwrap().evaluate(&scope));
    }

    #[test]
    fn test_condition_rejects_anything_else() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("$a.status = 'ok'").is_err());
        assert!(Condition::parse("__import__('os') == 1").is_err());
        assert!(Condition::parse("$a == 1 == 1").is_err());
        assert!(Condition::parse("'unterminated").is_err());
    }

    #[test]
    fn test_condition_references() {
        let condition = Condition::parse("$a.status == $inputs.expected").unwrap();
        let refs: Vec<String> = condition.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["$a.status", "$inputs.expected"]);
    }

    #[test]
    fn test_rewrite_references() {
        let rename = |root: &str| (root == "a").then(|| "wf_a".to_string());
        assert_eq!(rewrite_references("$a.status == 'ok'", &rename), "$wf_a.status == 'ok'");
        assert_eq!(rewrite_references("$prev.x", &rename), "$prev.x");
        assert_eq!(rewrite_references("$$a", &rename), "$$a");
    }

    #[test]
    fn test_find_references_flags_malformed() {
        let found = find_references(&json!({"x": "$a.", "y": "$b", "z": "plain"}));
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|(_, t)| *t == ReferenceText::Malformed));
    }
}
