//! Error and diagnostic system for the erDiagram parser.
//!
//! Every rejection the parser produces is a [`Diagnostic`]: a message with a
//! severity, an optional [`ErrorCode`], labelled source spans and help text.
//! A failed parse returns all diagnostics of the failing phase wrapped in a
//! [`ParseError`].
//!
//! # Example
//!
//! ```
//! # use ergen_parser::error::{Diagnostic, ErrorCode};
//! # use ergen_parser::Span;
//!
//! let diag = Diagnostic::error("unknown key modifier `PRIMARY`")
//!     .with_code(ErrorCode::E103)
//!     .with_label(Span::new(42..49), "not a key modifier")
//!     .with_help("use `PK`, `FK` or `UK`");
//! assert_eq!(diag.to_string(), "error[E103]: unknown key modifier `PRIMARY`");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
