/// Content policy gate
///
/// A lowercase substring check against a fixed denylist. There is no word
/// boundary handling: a listed term inside a longer word still matches.
use crate::error::{ContentError, Result};
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

/// Sexual-content and violent-threat terms blocked everywhere
const DEFAULT_DENYLIST: &[&str] = &[
    // sexual content
    "porn",
    "nude",
    "nudes",
    "sex",
    "xxx",
    "nsfw",
    "onlyfans",
    "rape",
    // violent threats
    "kill you",
    "i will kill",
    "shoot you",
    "stab you",
    "murder you",
    "bomb threat",
];

static DEFAULT_POLICY: Lazy<ContentPolicy> = Lazy::new(ContentPolicy::new);

/// Returns true when `text` contains a denylisted term (case-insensitive).
pub fn violates_policy(text: &str) -> bool {
    DEFAULT_POLICY.violates(text)
}

#[derive(Debug, Clone)]
pub struct ContentPolicy {
    terms: Vec<String>,
}

impl ContentPolicy {
    /// Policy with the built-in denylist
    pub fn new() -> Self {
        Self {
            terms: DEFAULT_DENYLIST.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Built-in denylist plus `extra` terms
    pub fn with_terms<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new();
        policy.extend(extra);
        policy
    }

    /// Built-in denylist plus one term per line of `path`.
    /// Blank lines and `#` comments are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ContentError::Config(format!(
                "Failed to load denylist from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let extra = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let policy = Self::with_terms(extra);
        tracing::info!(
            path = %path.as_ref().display(),
            terms = policy.terms.len(),
            "content policy loaded"
        );
        Ok(policy)
    }

    fn extend<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for term in extra {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !self.terms.contains(&term) {
                self.terms.push(term);
            }
        }
    }

    pub fn violates(&self, text: &str) -> bool {
        self.matched_term(text).is_some()
    }

    /// First denylisted term found in `text`
    pub fn matched_term(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let normalized = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| normalized.contains(term.as_str()))
            .map(String::as_str)
    }

    /// Rejects the first piece of text that violates the policy
    pub fn check<'a, I>(&self, texts: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for text in texts {
            if let Some(term) = self.matched_term(text) {
                tracing::warn!(term, "content rejected by policy");
                return Err(ContentError::PolicyViolation);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_safe_text() {
        assert!(!violates_policy("Community cleanup at the park on Saturday"));
        assert!(!violates_policy("classic car meetup"));
        assert!(!violates_policy(""));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(violates_policy("Selling NUDE photos"));
        assert!(violates_policy("i WILL KILL this workout"));
    }

    #[test]
    fn test_substring_inside_longer_word_matches() {
        // Brittle by construction: "Sussex" contains "sex".
        assert!(violates_policy("Greetings from Sussex"));
    }

    #[test]
    fn test_load_extra_terms_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# local additions").unwrap();
        writeln!(file, "Scam").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "porn").unwrap();

        let policy = ContentPolicy::from_file(file.path()).unwrap();
        assert_eq!(policy.len(), DEFAULT_DENYLIST.len() + 1);
        assert_eq!(policy.matched_term("obvious SCAM here"), Some("scam"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ContentPolicy::from_file("/nonexistent/denylist.txt").unwrap_err();
        assert!(matches!(err, ContentError::Config(_)));
    }

    #[test]
    fn test_check_reports_violation() {
        let policy = ContentPolicy::new();
        assert!(policy.check(["fine", "also fine"]).is_ok());
        assert!(matches!(
            policy.check(["fine", "xxx"]),
            Err(ContentError::PolicyViolation)
        ));
    }
}
