//! Lexical analyzer for erDiagram markup.
//!
//! The lexer converts markup into a stream of [`Token`]s for parsing. The
//! public entry point is [`tokenize`], which recovers from errors and collects
//! every lexer diagnostic in a single pass.

use winnow::{
    Parser as _,
    ascii::space0,
    combinator::{alt, cut_err, not, opt, peek, preceded, repeat, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, one_of, take_while},
};

use ergen_core::semantic::Cardinality;

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    span::Span,
    tokens::{PositionedToken, Token},
};

/// Rich diagnostic information for lexer errors.
///
/// Attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LexerDiagnostic {
    pub code: ErrorCode,
    pub message: &'static str,
    pub help: Option<&'static str>,
    /// The error span covers from `start` to the error position.
    pub start: usize,
}

type Input<'a> = LocatingSlice<&'a str>;
type IResult<'a, O> = ModalResult<O, ContextError<LexerDiagnostic>>;

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse a double-quoted string. Strings have no escapes and end at the line.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start_pos = input.current_token_start();

    '"'.parse_next(input)?;

    cut_err(terminated(
        take_while(0.., |c: char| !matches!(c, '"' | '\n' | '\r')),
        '"',
    ))
    .context(LexerDiagnostic {
        code: ErrorCode::E001,
        message: "unterminated string literal",
        help: Some("add closing `\"` before the end of the line"),
        start: start_pos,
    })
    .map(|content: &str| Token::StringLiteral(content.to_string()))
    .parse_next(input)
}

/// Parse a `%%` line comment
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    preceded("%%", take_while(0.., |c| c != '\n'))
        .map(Token::Comment)
        .parse_next(input)
}

/// Parse `accTitle: text`, `accDescr: text` and the multi-line
/// `accDescr { text }`.
///
/// Without the `:` or `{` the word is left to the identifier parser.
fn accessibility<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start_pos = input.current_token_start();

    alt((
        preceded(("accTitle", space0, ':'), rest_of_line).map(Token::AccTitle),
        preceded(("accDescr", space0, ':'), rest_of_line).map(Token::AccDescr),
        preceded(
            ("accDescr", space0, '{'),
            cut_err(terminated(take_while(0.., |c: char| c != '}'), '}')).context(
                LexerDiagnostic {
                    code: ErrorCode::E004,
                    message: "unterminated accessibility description",
                    help: Some("close the description with `}`"),
                    start: start_pos,
                },
            ),
        )
        .map(|text: &str| Token::AccDescr(text.trim())),
    ))
    .parse_next(input)
}

/// The rest of the current line, trimmed.
fn rest_of_line<'a>(input: &mut Input<'a>) -> IResult<'a, &'a str> {
    take_while(0.., |c: char| c != '\n')
        .map(str::trim)
        .parse_next(input)
}

/// Parse the numeric cardinalities `1`, `1+` and `0+`.
fn quantity<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    terminated(
        alt((literal("1+"), literal("0+"), literal("1"))),
        peek(not(one_of(is_identifier_char))),
    )
    .map(Token::Quantity)
    .parse_next(input)
}

/// Parse keywords with word boundary checking
fn keyword<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    terminated(
        alt((
            literal("erDiagram").value(Token::ErDiagram),
            literal("direction").value(Token::Direction),
        )),
        peek(not(one_of(is_identifier_char))),
    )
    .parse_next(input)
}

/// Parse one cardinality marker.
///
/// Both orientations are accepted on either side of the line, as in
/// `}o--o{` and `o{--}o`.
fn cardinality<'a>(input: &mut Input<'a>) -> IResult<'a, Cardinality> {
    alt((
        literal("|o").value(Cardinality::ZeroOrOne),
        literal("o|").value(Cardinality::ZeroOrOne),
        literal("||").value(Cardinality::ExactlyOne),
        literal("}o").value(Cardinality::ZeroOrMore),
        literal("o{").value(Cardinality::ZeroOrMore),
        literal("}|").value(Cardinality::OneOrMore),
        literal("|{").value(Cardinality::OneOrMore),
    ))
    .parse_next(input)
}

/// Parse the relationship line: `--` is identifying; `..`, `.-` and `-.`
/// are not.
fn relationship_line<'a>(input: &mut Input<'a>) -> IResult<'a, bool> {
    alt((
        literal("--").value(true),
        literal("..").value(false),
        literal(".-").value(false),
        literal("-.").value(false),
    ))
    .parse_next(input)
}

/// Parse a complete relationship operator such as `||--o{`.
///
/// Commits once a cardinality is directly followed by `-` or `.`, so
/// `||-o{` is reported as a malformed operator instead of stray characters.
fn relationship<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    let start_pos = input.current_token_start();

    let left = terminated(cardinality, peek(one_of(['-', '.']))).parse_next(input)?;

    cut_err((relationship_line, cardinality))
        .context(LexerDiagnostic {
            code: ErrorCode::E003,
            message: "malformed relationship operator",
            help: Some("write the line as `--` or `..`, e.g. `||--o{` or `}|..|{`"),
            start: start_pos,
        })
        .map(|(identifying, right)| Token::Relationship {
            left,
            right,
            identifying,
        })
        .parse_next(input)
}

/// Parse identifiers: `[A-Za-z_][A-Za-z0-9_-]*`.
///
/// Attribute words may also carry a `*` prefix and `(...)` groups, as in
/// `*order_id` or `varchar(255)`; the parser only accepts those forms
/// inside attribute blocks.
fn identifier<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    (
        opt('*'),
        take_while(1.., is_identifier_char).verify(|s: &str| {
            s.chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        }),
        repeat::<_, _, (), _, _>(0.., ('(', take_while(0.., is_identifier_char), ')')),
    )
        .take()
        .map(Token::Identifier)
        .parse_next(input)
}

/// Parse single character tokens
fn single_char_token<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    alt((
        '{'.value(Token::LeftBrace),
        '}'.value(Token::RightBrace),
        '['.value(Token::LeftBracket),
        ']'.value(Token::RightBracket),
        ':'.value(Token::Colon),
        ','.value(Token::Comma),
        ';'.value(Token::Semicolon),
    ))
    .parse_next(input)
}

/// Parse whitespace (spaces, tabs, carriage returns but not newlines)
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<'a, Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<'a, PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        line_comment,      // `%%` before anything else
        string_literal,    // Commits after the opening quote
        accessibility,     // Must come before identifier
        keyword,           // Must come before identifier
        relationship,      // Must come before identifier (`o|`, `o{`) and braces
        quantity,          // `1`, `1+`, `0+`
        identifier,        // Must come before single chars
        single_char_token, // Single character tokens
        newline,           // Must come before whitespace
        whitespace,
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();

    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Tokenize the input, collecting tokens and errors.
    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => self.tokens.push(token),
                Err(e) => {
                    let error_pos = input.current_token_start();
                    self.diagnostics.emit(Self::convert_err_mode(e, error_pos));

                    // Skip one character and keep going
                    if !input.is_empty() {
                        input.next_token();
                    }
                }
            }
        }
    }

    /// Finish lexing and return tokens or collected errors.
    fn finish(self) -> Result<Vec<PositionedToken<'a>>, ParseError> {
        let tokens = self.tokens;
        self.diagnostics.finish().map(|_warnings| tokens)
    }

    /// Convert an ErrMode and error position to a Diagnostic.
    ///
    /// Falls back to E002 (unexpected character) if no diagnostic context
    /// is found.
    fn convert_err_mode(
        err: ErrMode<ContextError<LexerDiagnostic>>,
        error_pos: usize,
    ) -> Diagnostic {
        let context_error = match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
            ErrMode::Incomplete(_) => ContextError::new(),
        };

        if let Some(LexerDiagnostic {
            code,
            message,
            help,
            start,
        }) = context_error.context().next()
        {
            let span = Span::new(*start..error_pos.max(*start + 1));

            let mut diag = Diagnostic::error(*message)
                .with_code(*code)
                .with_label(span, code.description());
            if let Some(h) = help {
                diag = diag.with_help(*h);
            }
            return diag;
        }

        let span = Span::new(error_pos..error_pos.saturating_add(1));
        Diagnostic::error("unexpected character")
            .with_code(ErrorCode::E002)
            .with_label(span, ErrorCode::E002.description())
            .with_help("names may only use ASCII letters, digits, `_` and `-`; quote anything else")
    }
}

/// Tokenize markup, collecting every lexer error in one pass.
///
/// # Returns
///
/// - `Ok(tokens)` - All tokens successfully lexed
/// - `Err(ParseError)` - One or more errors occurred; contains all diagnostics
pub fn tokenize(input: &str) -> Result<Vec<PositionedToken<'_>>, ParseError> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    lexer.finish()
}
