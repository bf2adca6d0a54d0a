//! Token definitions for erDiagram markup.

use std::fmt;

use winnow::stream::Location;

use ergen_core::semantic::Cardinality;

use crate::span::Span;

/// Token types produced by the [`lexer`](super::lexer).
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // Keywords
    ErDiagram,
    Direction,

    // Literals
    StringLiteral(String),
    Identifier(&'src str),
    /// A numeric cardinality: `1`, `1+` or `0+`.
    Quantity(&'src str),

    /// `accTitle: ...`, value trimmed
    AccTitle(&'src str),
    /// `accDescr: ...` or `accDescr { ... }`, value trimmed
    AccDescr(&'src str),

    /// A complete relationship operator such as `||--o{` or `}|..|{`.
    Relationship {
        left: Cardinality,
        right: Cardinality,
        identifying: bool,
    },

    // Punctuation
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Colon,        // :
    Comma,        // ,
    Semicolon,    // ;

    // Comments
    Comment(&'src str), // %% comment

    // Whitespace
    Whitespace,
    Newline,
}

impl Token<'_> {
    /// Tokens the parser skips between meaningful tokens.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::Comment(_) | Token::Semicolon
        )
    }
}

/// A token with position information for winnow integration
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl fmt::Display for PositionedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.token.fmt(f)
    }
}

impl Location for PositionedToken<'_> {
    fn previous_token_end(&self) -> usize {
        self.span.start()
    }

    fn current_token_start(&self) -> usize {
        self.span.start()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::ErDiagram => write!(f, "erDiagram"),
            Token::Direction => write!(f, "direction"),

            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Quantity(quantity) => write!(f, "{quantity}"),
            Token::AccTitle(_) => write!(f, "accTitle"),
            Token::AccDescr(_) => write!(f, "accDescr"),

            Token::Relationship {
                left,
                right,
                identifying,
            } => {
                let line = if *identifying { "--" } else { ".." };
                write!(f, "{}{line}{}", left.left_symbol(), right.right_symbol())
            }

            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),

            Token::Comment(comment) => write!(f, "%%{comment}"),
            Token::Whitespace => write!(f, " "),
            Token::Newline => write!(f, "\\n"),
        }
    }
}
