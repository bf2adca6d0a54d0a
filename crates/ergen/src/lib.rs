//! Ergen - entity-relationship diagrams from plain-language descriptions.
//!
//! A text-generation model drafts Mermaid `erDiagram` markup from a
//! description of a data domain. Ergen sanitizes the draft, validates it
//! against the `erDiagram` grammar, retries once when the model gets the
//! grammar wrong, and then derives a SQL schema and a quality audit from the
//! committed diagram. An audit can be fed back to rewrite the diagram.
//!
//! The [`Orchestrator`](orchestrator::Orchestrator) is the entry point for
//! anything that calls the model; [`check_markup`] validates markup offline.

pub mod client;
pub mod config;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod sanitize;
pub mod session;
pub mod validate;

mod error;

pub use ergen_core::semantic;
pub use ergen_parser::error::Diagnostic;

pub use error::ErgenError;

use log::{debug, info};

use semantic::ErDiagram;

/// Markup accepted by the grammar, with its semantic model.
#[derive(Debug, Clone)]
pub struct CheckedMarkup {
    markup: String,
    diagram: ErDiagram,
    warnings: Vec<Diagnostic>,
}

impl CheckedMarkup {
    /// The markup that was parsed, after sanitizing if requested.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn diagram(&self) -> &ErDiagram {
        &self.diagram
    }

    /// Non-fatal diagnostics, such as repeated key modifiers.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

/// Validate markup with the in-process grammar, without calling any model.
///
/// With `raw` set, the source is treated as unprocessed model output and
/// goes through [`sanitize`](sanitize::sanitize) first.
///
/// # Errors
///
/// Returns [`ErgenError::Parse`] carrying every diagnostic and the markup
/// they point into.
///
/// # Examples
///
/// ```
/// let checked = ergen::check_markup("```mermaid\nerDiagram\n    A ||--o{ B : has\n```", true)
///     .expect("valid after sanitizing");
///
/// assert_eq!(checked.diagram().entity_count(), 2);
/// assert!(ergen::check_markup("graph TD", false).is_err());
/// ```
pub fn check_markup(source: &str, raw: bool) -> Result<CheckedMarkup, ErgenError> {
    info!(raw = raw; "Checking diagram markup");

    let markup = if raw {
        sanitize::sanitize(source)
    } else {
        source.to_string()
    };

    let (diagram, warnings) = match ergen_parser::parse_with_warnings(&markup) {
        Ok(parsed) => parsed,
        Err(err) => return Err(ErgenError::new_parse_error(err, markup)),
    };

    debug!(
        entities = diagram.entity_count(),
        relationships = diagram.relationships().len(),
        warnings = warnings.len();
        "Markup accepted",
    );

    Ok(CheckedMarkup {
        markup,
        diagram,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_keeps_source_without_raw() {
        let err = check_markup("```mermaid\nerDiagram\n```", false).unwrap_err();

        let ErgenError::Parse { src, .. } = err else {
            panic!("expected a parse error");
        };
        assert_eq!(src, "```mermaid\nerDiagram\n```");
    }

    #[test]
    fn test_check_reports_warnings() {
        let checked = check_markup("erDiagram\n    A {\n        int id PK, PK\n    }", false).unwrap();

        assert_eq!(checked.warnings().len(), 1);
        assert_eq!(checked.markup(), "erDiagram\n    A {\n        int id PK, PK\n    }");
    }
}
