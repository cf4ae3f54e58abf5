//! Recognizers for confirmation prompts, each paired with the response that answers it.
//!
//! Two catalogs exist. The general catalog covers yes/no questions and answers `y`. The explicit
//! catalog covers requests to type the literal word `YES` and answers with exactly that. The two
//! share no vocabulary, so one never fires on the other's prompts.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Answer to a general yes/no prompt.
pub const AFFIRMATIVE: &str = "y";
/// Answer to a prompt demanding the literal word.
pub const EXPLICIT_AFFIRMATIVE: &str = "YES";

const GENERAL_PATTERNS: &[&str] = &[
    r"do you want to continue\?",
    r"\bproceed\?",
    r"\bconfirm\?",
    r"\[\s*y\s*/\s*n\s*\]",
    r"\(\s*y\s*/\s*n\s*\)",
    r"continue\?\s*$",
    r"\bare you sure\b[^?]*\?",
];

const EXPLICIT_PATTERNS: &[&str] = &[r#"\btype\s+['"]?yes\b"#];

#[derive(Debug, Error)]
#[error("invalid prompt pattern {pattern:?}: {source}")]
pub struct InvalidPattern {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

#[derive(Debug, Clone)]
pub struct PromptRule {
    matcher: Regex,
    response: String,
}

impl PromptRule {
    /// Compiles `pattern` case-insensitively.
    pub fn new(pattern: &str, response: impl Into<String>) -> Result<Self, InvalidPattern> {
        let matcher = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })?;
        Ok(Self {
            matcher,
            response: response.into(),
        })
    }

    pub fn matches(&self, line: &str) -> bool {
        self.matcher.is_match(line)
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}

/// An ordered set of [PromptRule]s. The first matching rule decides the response.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    rules: Vec<PromptRule>,
}

impl PromptCatalog {
    pub fn new(rules: Vec<PromptRule>) -> Self {
        Self { rules }
    }

    /// The built-in yes/no catalog.
    pub fn general() -> &'static PromptCatalog {
        static GENERAL: OnceLock<PromptCatalog> = OnceLock::new();
        GENERAL.get_or_init(|| builtin(GENERAL_PATTERNS, AFFIRMATIVE))
    }

    /// The built-in "type YES" catalog.
    pub fn explicit_affirmation() -> &'static PromptCatalog {
        static EXPLICIT: OnceLock<PromptCatalog> = OnceLock::new();
        EXPLICIT.get_or_init(|| builtin(EXPLICIT_PATTERNS, EXPLICIT_AFFIRMATIVE))
    }

    pub fn push(&mut self, rule: PromptRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[PromptRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn response_for(&self, line: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(line))
            .map(PromptRule::response)
    }
}

fn builtin(patterns: &[&str], response: &str) -> PromptCatalog {
    let rules = patterns
        .iter()
        .map(|pattern| {
            PromptRule::new(pattern, response).expect("built-in prompt patterns always compile")
        })
        .collect();
    PromptCatalog::new(rules)
}

#[cfg(test)]
mod test {
    use super::{PromptCatalog, PromptRule, AFFIRMATIVE, EXPLICIT_AFFIRMATIVE};

    #[test]
    fn builtins_compile() {
        assert!(!PromptCatalog::general().is_empty());
        assert!(!PromptCatalog::explicit_affirmation().is_empty());
    }

    #[test]
    fn general_vocabulary() {
        let general = PromptCatalog::general();
        for line in [
            "Do you want to continue? [y/N]",
            "Proceed? (y/N)",
            "Are you sure?",
            "Are you sure you want to overwrite the export?",
            "Please confirm?",
            "Overwrite existing files [Y/n]",
            "Install missing templates ( y / n )",
            "Some packages are outdated, continue?",
            "DO YOU WANT TO CONTINUE?",
        ] {
            assert_eq!(general.response_for(line), Some(AFFIRMATIVE), "{line}");
        }
    }

    #[test]
    fn general_ignores_ordinary_output() {
        let general = PromptCatalog::general();
        for line in [
            "Building target linux-x64",
            "continue reading the manual for details",
            "proceeding with export",
            "Confirmed 3 assets",
            "Are you sure",
            "",
        ] {
            assert_eq!(general.response_for(line), None, "{line}");
        }
    }

    #[test]
    fn explicit_vocabulary() {
        let explicit = PromptCatalog::explicit_affirmation();
        for line in [
            "Type YES to continue",
            "type yes to wipe the build cache",
            "Please type 'YES' to confirm",
            "TYPE \"Yes\" TO PROCEED",
        ] {
            assert_eq!(explicit.response_for(line), Some(EXPLICIT_AFFIRMATIVE), "{line}");
        }
    }

    #[test]
    fn catalogs_do_not_cross_fire() {
        assert_eq!(
            PromptCatalog::explicit_affirmation().response_for("Proceed? [y/N]"),
            None
        );
        assert_eq!(
            PromptCatalog::general().response_for("Type YES to wipe the cache"),
            None
        );
        assert_eq!(
            PromptCatalog::explicit_affirmation().response_for("typed yesterday"),
            None
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let catalog = PromptCatalog::new(vec![
            PromptRule::new("overwrite", "a").unwrap(),
            PromptRule::new("overwrite all", "b").unwrap(),
        ]);
        assert_eq!(catalog.response_for("Overwrite all files?"), Some("a"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = PromptRule::new("(unclosed", "y").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
        assert!(err.to_string().contains("(unclosed"));
    }
}
