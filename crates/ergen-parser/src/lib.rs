//! # Ergen Parser
//!
//! Parser for Mermaid `erDiagram` markup. This crate decides whether markup
//! is a well-formed entity-relationship diagram and, when it is, builds the
//! semantic [`ErDiagram`].
//!
//! ## Usage
//!
//! ```
//! # use ergen_parser::{parse, error::ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//!     erDiagram
//!         CUSTOMER ||--o{ ORDER : places
//!         ORDER {
//!             int id PK
//!             string status
//!         }
//!     "#;
//!
//!     let diagram = parse(source)?;
//!     assert_eq!(diagram.entity_count(), 2);
//!     Ok(())
//! }
//! ```

mod elaborate;
pub mod error;
mod lexer;
mod parser;
mod parser_types;
mod span;
mod tokens;

pub use error::ParseError;
pub use span::Span;

use log::debug;

use ergen_core::semantic::ErDiagram;

use elaborate::Builder;
use error::Diagnostic;

/// Parse markup into a semantic diagram.
///
/// The pipeline runs three phases, each of which may reject the markup:
///
/// 1. **Tokenize** - Convert source text to tokens
/// 2. **Parse** - Build the syntax tree from tokens
/// 3. **Elaborate** - Check keys and directions, merge entities
///
/// Warnings are dropped; use [`parse_with_warnings`] to keep them.
///
/// # Example
///
/// ```
/// # use ergen_parser::parse;
/// let diagram = parse("erDiagram\n    A ||--|{ B : has").expect("valid markup");
/// assert_eq!(diagram.relationships().len(), 1);
///
/// assert!(parse("graph TD\n    A --> B").is_err());
/// ```
pub fn parse(source: &str) -> Result<ErDiagram, ParseError> {
    parse_with_warnings(source).map(|(diagram, _warnings)| diagram)
}

/// Parse markup into a semantic diagram, returning warnings alongside it.
pub fn parse_with_warnings(source: &str) -> Result<(ErDiagram, Vec<Diagnostic>), ParseError> {
    debug!(bytes = source.len(); "Parsing erDiagram markup");

    // Step 1: Tokenize
    let tokens = lexer::tokenize(source)?;

    // Step 2: Parse
    let document = parser::build_document(&tokens)?;

    // Step 3: Elaborate
    Builder::new().build(&document)
}
