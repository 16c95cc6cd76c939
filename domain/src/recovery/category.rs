//! Error categories and the table-driven classifier.
//!
//! Classification matches `"{kind}: {message}"` of a [`ToolError`] against an
//! ordered list of case-insensitive patterns; the first match wins and
//! anything unmatched is [`ErrorCategory::Unknown`]. The table is a
//! heuristic: novel error text will land in `Unknown`, which always has its
//! own (non-retrying) default strategy.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::tool::value_objects::ToolError;

/// Run-time failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Authentication,
    RateLimit,
    Validation,
    Dependency,
    ResourceNotFound,
    Permission,
    Syntax,
    Timeout,
    Unknown,
    /// Monetary, token or wall-clock budget overrun. Never produced by the
    /// classifier and never recovered.
    BudgetExceeded,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Dependency => "dependency",
            ErrorCategory::ResourceNotFound => "resource_not_found",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Syntax => "syntax",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unknown => "unknown",
            ErrorCategory::BudgetExceeded => "budget_exceeded",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ErrorCategory::BudgetExceeded)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = String;

    /// Accepts snake_case, kebab-case and the short `not_found` / `auth` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "network" => Ok(ErrorCategory::Network),
            "authentication" | "auth" => Ok(ErrorCategory::Authentication),
            "rate_limit" | "ratelimit" => Ok(ErrorCategory::RateLimit),
            "validation" => Ok(ErrorCategory::Validation),
            "dependency" => Ok(ErrorCategory::Dependency),
            "resource_not_found" | "not_found" => Ok(ErrorCategory::ResourceNotFound),
            "permission" => Ok(ErrorCategory::Permission),
            "syntax" => Ok(ErrorCategory::Syntax),
            "timeout" => Ok(ErrorCategory::Timeout),
            "unknown" => Ok(ErrorCategory::Unknown),
            "budget_exceeded" => Ok(ErrorCategory::BudgetExceeded),
            _ => Err(format!("unknown error category '{}'", s)),
        }
    }
}

const BUILTIN_PATTERNS: [(ErrorCategory, &str); 9] = [
    (
        ErrorCategory::Network,
        r"(?i)connection|network|unreachable|refused|reset by peer|\bdns\b|socket|econn",
    ),
    (
        ErrorCategory::Authentication,
        r"(?i)auth|unauthori[sz]ed|\b401\b|credential|token (?:has )?expired|expired token|invalid token",
    ),
    (
        ErrorCategory::RateLimit,
        r"(?i)rate.?limit|\b429\b|too many requests|quota|throttl",
    ),
    (
        ErrorCategory::Validation,
        r"(?i)validation|invalid|malformed|bad request|\b400\b|type ?error|value ?error",
    ),
    (
        ErrorCategory::Dependency,
        r"(?i)no module named|module ?not ?found|import ?error|cannot find module|missing dependency|dependency",
    ),
    (
        ErrorCategory::ResourceNotFound,
        r"(?i)not found|\b404\b|does not exist|no such",
    ),
    (
        ErrorCategory::Permission,
        r"(?i)permission|forbidden|\b403\b|access denied|not allowed",
    ),
    (
        ErrorCategory::Syntax,
        r"(?i)syntax|parse error|unexpected token|unexpected eof",
    ),
    (
        ErrorCategory::Timeout,
        r"(?i)timeout|timed out|deadline exceeded",
    ),
];

static BUILTIN_RULES: LazyLock<Vec<(ErrorCategory, Regex)>> = LazyLock::new(|| {
    BUILTIN_PATTERNS
        .iter()
        .map(|(category, pattern)| {
            (
                *category,
                Regex::new(pattern).expect("builtin classification pattern"),
            )
        })
        .collect()
});

static MISSING_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:no module named|cannot find module|missing dependency:?|module not found:?)\s+['"`]?([A-Za-z0-9_.\-@/]+)['"`]?"#,
    )
    .expect("missing module pattern")
});

/// Ordered pattern table mapping error text to an [`ErrorCategory`].
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<(ErrorCategory, Regex)>,
}

impl ErrorClassifier {
    /// Classifier with the builtin pattern table.
    pub fn new() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
        }
    }

    /// Add a rule that is consulted before every existing one.
    pub fn with_rule(mut self, category: ErrorCategory, pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.insert(0, (category, regex));
        Ok(self)
    }

    pub fn classify(&self, error: &ToolError) -> ErrorCategory {
        self.classify_text(&error.classification_text())
    }

    pub fn classify_text(&self, text: &str) -> ErrorCategory {
        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Unknown)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the missing module name out of a dependency error.
///
/// Dotted Python-style paths are reduced to their top-level package
/// (`No module named 'yaml.loader'` → `yaml`).
pub fn extract_missing_module(text: &str) -> Option<String> {
    let captures = MISSING_MODULE.captures(text)?;
    let name = captures.get(1)?.as_str().trim_end_matches(['.', ',']);
    let top_level = if name.starts_with('@') {
        name
    } else {
        name.split('.').next().unwrap_or(name)
    };
    (!top_level.is_empty()).then(|| top_level.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(kind: &str, message: &str) -> ErrorCategory {
        ErrorClassifier::new().classify(&ToolError::new(kind, message))
    }

    #[test]
    fn test_classifies_each_builtin_category() {
        assert_eq!(classify("ConnectionError", "connection refused"), ErrorCategory::Network);
        assert_eq!(classify("HTTPError", "401 Unauthorized"), ErrorCategory::Authentication);
        assert_eq!(classify("HTTPError", "429 Too Many Requests"), ErrorCategory::RateLimit);
        assert_eq!(classify("ValidationError", "invalid email"), ErrorCategory::Validation);
        assert_eq!(
            classify("ModuleNotFoundError", "No module named 'yaml'"),
            ErrorCategory::Dependency
        );
        assert_eq!(classify("HTTPError", "404: bucket does not exist"), ErrorCategory::ResourceNotFound);
        assert_eq!(classify("OSError", "access denied to /etc"), ErrorCategory::Permission);
        assert_eq!(classify("SyntaxError", "unexpected EOF"), ErrorCategory::Syntax);
        assert_eq!(
            ErrorClassifier::new().classify(&ToolError::timeout(std::time::Duration::from_secs(2))),
            ErrorCategory::Timeout
        );
    }

    #[test]
    fn test_static_patterns_compile() {
        for (category, pattern) in BUILTIN_PATTERNS {
            assert!(Regex::new(pattern).is_ok(), "{} pattern does not compile", category);
        }
        assert_eq!(LazyLock::force(&BUILTIN_RULES).len(), BUILTIN_PATTERNS.len());
        assert!(LazyLock::force(&MISSING_MODULE).is_match("No module named 'x'"));
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions both a connection and a timeout; network is earlier in the table.
        assert_eq!(classify("OSError", "connection timed out"), ErrorCategory::Network);
        // "invalid token" is authentication even though "invalid" is a validation word.
        assert_eq!(classify("ApiError", "invalid token"), ErrorCategory::Authentication);
    }

    #[test]
    fn test_unmatched_text_is_unknown() {
        assert_eq!(classify("ExecutionError", "something odd happened"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_custom_rule_takes_precedence() {
        let classifier = ErrorClassifier::new()
            .with_rule(ErrorCategory::RateLimit, r"(?i)slow down")
            .unwrap();
        assert_eq!(
            classifier.classify_text("ConnectionError: please slow down"),
            ErrorCategory::RateLimit
        );
    }

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!("rate-limit".parse::<ErrorCategory>(), Ok(ErrorCategory::RateLimit));
        assert_eq!("not_found".parse::<ErrorCategory>(), Ok(ErrorCategory::ResourceNotFound));
        assert!("cosmic_rays".parse::<ErrorCategory>().is_err());
    }

    #[test]
    fn test_extract_missing_module() {
        assert_eq!(
            extract_missing_module("ModuleNotFoundError: No module named 'yaml.loader'"),
            Some("yaml".to_string())
        );
        assert_eq!(
            extract_missing_module("Error: Cannot find module \"left-pad\""),
            Some("left-pad".to_string())
        );
        assert_eq!(extract_missing_module("ImportError: cannot import name"), None);
    }

    #[test]
    fn test_budget_exceeded_is_not_recoverable() {
        assert!(!ErrorCategory::BudgetExceeded.is_recoverable());
        assert!(ErrorCategory::Unknown.is_recoverable());
    }
}
