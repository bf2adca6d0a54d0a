//! Diagram validation.
//!
//! An [`Oracle`] answers one question: does the grammar accept this markup?
//! The [`Validator`] wraps it and hands out [`ValidatedMarkup`], the only
//! value a session will commit as its diagram.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use log::debug;

/// Rejection reported by an [`Oracle`], carrying its diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The parse capability of a diagram grammar, used purely as a classifier.
///
/// Implementations must not have observable side effects.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn parse(&self, markup: &str) -> Result<(), Rejection>;
}

/// [`Oracle`] backed by the in-process `erDiagram` parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarOracle;

#[async_trait]
impl Oracle for GrammarOracle {
    async fn parse(&self, markup: &str) -> Result<(), Rejection> {
        ergen_parser::parse(markup)
            .map(|_diagram| ())
            .map_err(|err| Rejection::new(err.to_string()))
    }
}

/// Markup the oracle has accepted.
///
/// Only a [`Validator`] can create one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMarkup(String);

impl ValidatedMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(ValidatedMarkup),
    Invalid { reason: String },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
}

/// Classifies candidate markup as valid or invalid.
#[derive(Clone)]
pub struct Validator {
    oracle: Arc<dyn Oracle>,
}

impl Validator {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Validate `markup`. Any rejection, including total parse failure, is
    /// [`Validation::Invalid`] with the oracle's diagnostic as reason.
    pub async fn validate(&self, markup: String) -> Validation {
        match self.oracle.parse(&markup).await {
            Ok(()) => {
                debug!(bytes = markup.len(); "Markup accepted");
                Validation::Valid(ValidatedMarkup(markup))
            }
            Err(rejection) => {
                debug!(reason = rejection.reason(); "Markup rejected");
                Validation::Invalid {
                    reason: rejection.reason,
                }
            }
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Arc::new(GrammarOracle))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    #[async_trait]
    impl Oracle for RejectAll {
        async fn parse(&self, _markup: &str) -> Result<(), Rejection> {
            Err(Rejection::new("nope"))
        }
    }

    #[tokio::test]
    async fn test_grammar_oracle_accepts_er_markup() {
        let validation = Validator::default()
            .validate("erDiagram\n    A ||--o{ B : has".to_string())
            .await;

        let Validation::Valid(markup) = validation else {
            panic!("expected valid markup, got {validation:?}");
        };
        assert_eq!(markup.as_str(), "erDiagram\n    A ||--o{ B : has");
    }

    #[tokio::test]
    async fn test_grammar_oracle_reason_is_diagnostic() {
        let validation = Validator::default()
            .validate("erDiagram\n    A ||--o{ B".to_string())
            .await;

        let Validation::Invalid { reason } = validation else {
            panic!("expected invalid markup");
        };
        assert!(reason.contains("E101"), "{reason}");
    }

    #[tokio::test]
    async fn test_empty_markup_is_invalid() {
        assert!(!Validator::default().validate(String::new()).await.is_valid());
    }

    #[tokio::test]
    async fn test_custom_oracle() {
        let validator = Validator::new(Arc::new(RejectAll));

        assert_eq!(
            validator.validate("erDiagram".to_string()).await,
            Validation::Invalid {
                reason: "nope".to_string()
            }
        );
    }
}
