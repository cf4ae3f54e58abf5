use crate::catalog::{PromptCatalog, PromptRule};

/// Decides whether a line of tool output is a confirmation prompt, and what to answer.
///
/// Classification is a pure function of the line: the classifier keeps no state between calls and
/// knows nothing about the tool beyond its catalogs.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    general: PromptCatalog,
    explicit: PromptCatalog,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self {
            general: PromptCatalog::general().clone(),
            explicit: PromptCatalog::explicit_affirmation().clone(),
        }
    }
}

impl LineClassifier {
    /// Built-in catalogs, with `extra` rules appended to the general catalog.
    pub fn with_extra_rules(extra: impl IntoIterator<Item = PromptRule>) -> Self {
        let mut classifier = Self::default();
        for rule in extra {
            classifier.general.push(rule);
        }
        classifier
    }

    pub fn classify<'a>(&'a self, line: &str) -> Verdict<'a> {
        Verdict {
            general: self.general.response_for(line),
            explicit: self.explicit.response_for(line),
        }
    }

    /// Only consults the explicit-affirmation catalog.
    pub fn explicit_affirmation(&self, line: &str) -> Option<&str> {
        self.explicit.response_for(line)
    }
}

/// The responses a line calls for. A line may call for both; the general response is sent
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict<'a> {
    pub general: Option<&'a str>,
    pub explicit: Option<&'a str>,
}

impl<'a> Verdict<'a> {
    pub fn is_prompt(&self) -> bool {
        self.general.is_some() || self.explicit.is_some()
    }

    pub fn responses(&self) -> impl Iterator<Item = &'a str> {
        self.general.into_iter().chain(self.explicit)
    }
}
