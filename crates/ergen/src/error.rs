//! Error types for ergen operations.
//!
//! This module provides the main error type [`ErgenError`]. Only service
//! failures and exhausted retries reach the user from a generation request;
//! a single invalid candidate is retried silently and never becomes an error.

use std::io;

use thiserror::Error;

use ergen_parser::error::ParseError;

use crate::client::GenerationError;

/// The main error type for ergen operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant carries the parser diagnostics together with the
/// markup they point into, for rich error reporting.
#[derive(Debug, Error)]
pub enum ErgenError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("missing API key; set GEMINI_API_KEY or pass --api-key")]
    MissingCredential,

    #[error("{message}")]
    GenerationService { message: String },

    #[error("the model produced invalid markup twice; simplify the description or change model.")]
    RetryExhausted { reason: String },

    #[error("could not apply the fixes: {reason}")]
    FixRejected { reason: String },

    #[error("write a description of the data domain first")]
    EmptyDescription,
}

impl ErgenError {
    /// Create a new `Parse` error with the associated source markup.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}

impl From<GenerationError> for ErgenError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::MissingCredential => Self::MissingCredential,
            GenerationError::Service { message } => Self::GenerationService { message },
        }
    }
}
