use crate::error::{EngineError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A user-supplied search target: literal text or a regular expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub text: String,

    /// Compile `text` as a regular expression instead of literal text
    #[serde(default)]
    pub use_regex: bool,

    /// Match case exactly (default is case-insensitive)
    #[serde(default)]
    pub case_sensitive: bool,
}

impl PatternSpec {
    /// Literal, case-insensitive pattern
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            use_regex: false,
            case_sensitive: false,
        }
    }

    /// Regular-expression, case-insensitive pattern
    pub fn regex(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            use_regex: true,
            case_sensitive: false,
        }
    }

    /// Builder: set case sensitivity
    #[must_use]
    pub const fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Compile into a matcher. Literal text has every metacharacter escaped.
    pub fn compile(&self) -> Result<Regex> {
        let source = self.source()?;
        build_regex(&source, self.case_sensitive)
    }

    /// Compile for whole-word deletion: literal text is wrapped in `\b` boundaries,
    /// regular expressions are used as given
    pub fn compile_word_bounded(&self) -> Result<Regex> {
        let source = self.source()?;
        if self.use_regex {
            build_regex(&source, self.case_sensitive)
        } else {
            build_regex(&format!(r"\b{source}\b"), self.case_sensitive)
        }
    }

    fn source(&self) -> Result<String> {
        if self.text.is_empty() {
            return Err(EngineError::MissingInput("pattern"));
        }
        Ok(if self.use_regex {
            self.text.clone()
        } else {
            regex::escape(&self.text)
        })
    }
}

fn build_regex(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| EngineError::invalid_pattern(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_metacharacters() {
        let regex = PatternSpec::literal("a.b (c)*").compile().unwrap();
        assert!(regex.is_match("x a.b (c)* y"));
        assert!(!regex.is_match("axb (c)"));
    }

    #[test]
    fn case_insensitive_by_default() {
        let regex = PatternSpec::literal("cat").compile().unwrap();
        assert_eq!(regex.find_iter("Cat and CAT and cat").count(), 3);

        let exact = PatternSpec::literal("cat").case_sensitive(true).compile().unwrap();
        assert_eq!(exact.find_iter("Cat and CAT and cat").count(), 1);
    }

    #[test]
    fn regex_mode_compiles_as_is() {
        let regex = PatternSpec::regex(r"\d+px").compile().unwrap();
        assert!(regex.is_match("512px"));
    }

    #[test]
    fn invalid_regex_surfaces_message() {
        let err = PatternSpec::regex("(unclosed").compile().unwrap_err();
        match err {
            EngineError::InvalidPattern(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_pattern_is_missing_input() {
        assert!(matches!(
            PatternSpec::literal("").compile(),
            Err(EngineError::MissingInput("pattern"))
        ));
    }

    #[test]
    fn word_bounded_literal_skips_inner_matches() {
        let regex = PatternSpec::literal("cat").compile_word_bounded().unwrap();
        assert!(regex.is_match("a cat, dog"));
        assert!(!regex.is_match("category, dogcat"));
    }

    #[test]
    fn word_bounded_regex_is_unchanged() {
        let regex = PatternSpec::regex("cat").compile_word_bounded().unwrap();
        assert!(regex.is_match("category"));
    }
}
