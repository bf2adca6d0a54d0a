//! Error codes for the diagnostic system.
//!
//! Codes are grouped by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A string was opened with a quote but not closed on the same line.
    E001,

    /// Unexpected character.
    ///
    /// A character was encountered that cannot start any token. Accented
    /// letters outside quoted strings end up here.
    E002,

    /// Malformed relationship operator.
    ///
    /// A left cardinality (`|o`, `||`, `}o`, `}|`) was not followed by a
    /// line (`--`, `..`, `.-` or `-.`) and a right cardinality (`o|`, `||`, `o{`, `|{`).
    E003,

    /// Unterminated accessibility description.
    ///
    /// A multi-line `accDescr {` block was not closed with `}`.
    E004,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// The parser encountered a token it did not expect at this position.
    E100,

    /// Incomplete input.
    ///
    /// The input ended before a complete construct was parsed.
    E101,

    /// Missing diagram declaration.
    ///
    /// The source does not start with the `erDiagram` keyword.
    E102,

    /// Invalid key modifier.
    ///
    /// An attribute key list contained something other than `PK`, `FK` or `UK`.
    E103,

    /// Invalid direction.
    ///
    /// A `direction` statement named something other than `TB`, `BT`, `LR` or `RL`.
    E104,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
            ErrorCode::E104 => "E104",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "malformed relationship operator",
            ErrorCode::E004 => "unterminated accessibility description",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E102 => "missing diagram declaration",
            ErrorCode::E103 => "invalid key modifier",
            ErrorCode::E104 => "invalid direction",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
