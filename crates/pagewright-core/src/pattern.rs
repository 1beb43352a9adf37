//! Label and value patterns with embedded capture variables.
//!
//! A pattern is literal text that may contain placeholders produced by
//! [`TestData`](crate::test_data::TestData) values. Without placeholders a
//! pattern matches by exact equality. With placeholders, each placeholder
//! becomes a greedy capture group in an anchored regular expression and the
//! surrounding text is matched literally.
//!
//! ```
//! use pagewright_core::pattern::LabelPattern;
//! use pagewright_core::test_data::TestData;
//!
//! let price = TestData::new();
//! let pattern = LabelPattern::parse(&format!("Buy now for {price}")).unwrap();
//!
//! let captures = pattern.captures("Buy now for 7.77 EUR").unwrap();
//! assert_eq!(captures[0].value, "7.77 EUR");
//! assert!(pattern.captures("Sold out").is_none());
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Matches a placeholder token: an upper-case hyphenated UUID in braces.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-F0-9]{8}-[A-F0-9]{4}-[A-F0-9]{4}-[A-F0-9]{4}-[A-F0-9]{12})\}")
        .expect("placeholder regex is valid")
});

/// Errors raised while compiling a pattern.
///
/// These are setup errors in a page declaration and are never retried.
#[derive(Error, Debug)]
pub enum PatternError {
    /// The same capture variable appears more than once, so its value is ambiguous.
    #[error("pattern '{pattern}' uses variable {variable} more than once")]
    DuplicateVariable {
        /// The offending pattern.
        pattern: String,
        /// The repeated variable.
        variable: Uuid,
    },

    /// The generated regular expression could not be built.
    #[error("pattern '{pattern}' failed to compile: {source}")]
    Compile {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        source: regex::Error,
    },
}

/// A substring extracted for one capture variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Identity of the [`TestData`](crate::test_data::TestData) variable.
    pub variable: Uuid,
    /// The captured text.
    pub value: String,
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal,
    Template { regex: Regex, variables: Vec<Uuid> },
}

/// A compiled label or value pattern.
#[derive(Debug, Clone)]
pub struct LabelPattern {
    source: String,
    matcher: Matcher,
}

impl LabelPattern {
    /// Compiles a pattern.
    ///
    /// Returns [`PatternError::DuplicateVariable`] when a placeholder repeats.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut variables: Vec<Uuid> = Vec::new();
        let mut expression = String::from("(?s)^");
        let mut literal_start = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(token), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Ok(variable) = Uuid::parse_str(id.as_str()) else {
                continue;
            };
            if variables.contains(&variable) {
                return Err(PatternError::DuplicateVariable {
                    pattern: source.to_string(),
                    variable,
                });
            }
            expression.push_str(&regex::escape(&source[literal_start..token.start()]));
            expression.push_str("(.*)");
            variables.push(variable);
            literal_start = token.end();
        }

        if variables.is_empty() {
            return Ok(Self {
                source: source.to_string(),
                matcher: Matcher::Literal,
            });
        }

        expression.push_str(&regex::escape(&source[literal_start..]));
        expression.push('$');
        let regex = Regex::new(&expression).map_err(|source_err| PatternError::Compile {
            pattern: source.to_string(),
            source: source_err,
        })?;

        Ok(Self {
            source: source.to_string(),
            matcher: Matcher::Template { regex, variables },
        })
    }

    /// The pattern text as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern contains capture variables.
    pub fn has_variables(&self) -> bool {
        matches!(self.matcher, Matcher::Template { .. })
    }

    /// The capture variables in order of appearance.
    pub fn variables(&self) -> &[Uuid] {
        match &self.matcher {
            Matcher::Literal => &[],
            Matcher::Template { variables, .. } => variables,
        }
    }

    /// Tests a candidate without extracting captures.
    pub fn is_match(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Literal => self.source == candidate,
            Matcher::Template { regex, .. } => regex.is_match(candidate),
        }
    }

    /// Matches a candidate and returns the captured values.
    ///
    /// `None` means no match. A literal pattern that matches yields an empty list.
    pub fn captures(&self, candidate: &str) -> Option<Vec<Capture>> {
        match &self.matcher {
            Matcher::Literal => (self.source == candidate).then(Vec::new),
            Matcher::Template { regex, variables } => {
                let caps = regex.captures(candidate)?;
                Some(
                    variables
                        .iter()
                        .enumerate()
                        .map(|(i, variable)| Capture {
                            variable: *variable,
                            value: caps
                                .get(i + 1)
                                .map(|m| m.as_str().to_string())
                                .unwrap_or_default(),
                        })
                        .collect(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::TestData;

    #[test]
    fn test_literal_is_exact_equality() {
        let pattern = LabelPattern::parse("Log In").unwrap();
        assert!(!pattern.has_variables());
        assert!(pattern.is_match("Log In"));
        assert!(!pattern.is_match("Log In "));
        assert!(!pattern.is_match("Log"));
        assert_eq!(pattern.captures("Log In"), Some(vec![]));
    }

    #[test]
    fn test_literal_with_regex_metacharacters() {
        let pattern = LabelPattern::parse("Total (incl. tax): $5.00?").unwrap();
        assert!(pattern.is_match("Total (incl. tax): $5.00?"));
        assert!(!pattern.is_match("Total (incl- tax): $5.00"));
    }

    #[test]
    fn test_single_variable_capture() {
        let price = TestData::new();
        let pattern = LabelPattern::parse(&format!("Buy now for {}", price)).unwrap();
        assert_eq!(pattern.variables(), &[price.id()]);

        let caps = pattern.captures("Buy now for 7.77 EUR").unwrap();
        assert_eq!(caps, vec![Capture { variable: price.id(), value: "7.77 EUR".to_string() }]);

        let caps = pattern.captures("Buy now for 9.99 USD").unwrap();
        assert_eq!(caps[0].value, "9.99 USD");
    }

    #[test]
    fn test_escaped_literal_around_variable() {
        let amount = TestData::new();
        let pattern = LabelPattern::parse(&format!("Total (${}).", amount)).unwrap();
        let caps = pattern.captures("Total ($12).").unwrap();
        assert_eq!(caps[0].value, "12");
        assert!(pattern.captures("Total x$12).").is_none());
    }

    #[test]
    fn test_multiple_variables_in_order() {
        let first = TestData::new();
        let second = TestData::new();
        let pattern = LabelPattern::parse(&format!("{} of {}", first, second)).unwrap();
        let caps = pattern.captures("3 of 10").unwrap();
        assert_eq!(caps[0].variable, first.id());
        assert_eq!(caps[0].value, "3");
        assert_eq!(caps[1].variable, second.id());
        assert_eq!(caps[1].value, "10");
    }

    #[test]
    fn test_anchored_whole_string() {
        let name = TestData::new();
        let pattern = LabelPattern::parse(&format!("Hello {}!", name)).unwrap();
        assert!(pattern.is_match("Hello World!"));
        assert!(!pattern.is_match("Oh, Hello World!"));
        assert!(!pattern.is_match("Hello World!!?"));
    }

    #[test]
    fn test_variable_captures_multiline_text() {
        let body = TestData::new();
        let pattern = LabelPattern::parse(&format!("Note: {}", body)).unwrap();
        let caps = pattern.captures("Note: line one\nline two").unwrap();
        assert_eq!(caps[0].value, "line one\nline two");
    }

    #[test]
    fn test_duplicate_variable_is_rejected() {
        let value = TestData::new();
        let err = LabelPattern::parse(&format!("{} and {}", value, value)).unwrap_err();
        assert!(matches!(err, PatternError::DuplicateVariable { variable, .. } if variable == value.id()));
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_lowercase_braces_stay_literal() {
        let pattern = LabelPattern::parse("{not-a-placeholder}").unwrap();
        assert!(!pattern.has_variables());
        assert!(pattern.is_match("{not-a-placeholder}"));
    }
}
