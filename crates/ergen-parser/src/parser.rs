//! Parser for erDiagram tokens.
//!
//! This module turns the token stream from the [`lexer`](super::lexer) into
//! the syntax tree defined in [`parser_types`](super::parser_types). The
//! public entry point is [`build_document`].

use winnow::{
    Parser as _,
    combinator::{alt, opt, preceded, repeat},
    error::{ContextError, ErrMode},
    stream::{Stream, TokenSlice},
    token::any,
};

use ergen_core::semantic::Cardinality;

use crate::{
    error::{Diagnostic, ErrorCode},
    parser_types as types,
    span::{Span, Spanned},
    tokens::{PositionedToken, Token},
};

/// Context type for parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Context {
    /// Description of what was expected
    Label(&'static str),
    /// Remaining token count (`eof_offset()`) where the failing construct started
    StartOffset(usize),
}

type Input<'src> = ErTokenSlice<'src>;
type IResult<O> = std::result::Result<O, ErrMode<ContextError<Context>>>;
type ErTokenSlice<'src> = TokenSlice<'src, PositionedToken<'src>>;

/// Run `f` and turn any failure into a committed error.
fn cut_err<'src, O, F>(input: &mut Input<'src>, f: F) -> IResult<O>
where
    F: FnOnce(&mut Input<'src>) -> IResult<O>,
{
    let start_remaining = input.eof_offset();

    match f(input) {
        Ok(o) => Ok(o),
        Err(ErrMode::Backtrack(mut e)) | Err(ErrMode::Cut(mut e)) => {
            e.push(Context::StartOffset(start_remaining));
            Err(ErrMode::Cut(e))
        }
        Err(e) => Err(e),
    }
}

/// Helper to create a Cut error with StartOffset context
fn cut_error_with_offset<'src>(input: &Input<'src>) -> ErrMode<ContextError<Context>> {
    let mut e = ContextError::new();
    e.push(Context::StartOffset(input.eof_offset()));
    ErrMode::Cut(e)
}

/// Parse one trivia token: whitespace, newline, comment or `;`
fn trivia<'src>(input: &mut Input<'src>) -> IResult<()> {
    any.verify(|token: &PositionedToken<'_>| token.token.is_trivia())
        .void()
        .parse_next(input)
}

fn trivia0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(0.., trivia).parse_next(input)
}

/// Skip trivia, then match a single token and return its span.
fn expect<'src>(
    input: &mut Input<'src>,
    is_expected: fn(&Token<'_>) -> bool,
    label: &'static str,
) -> IResult<Span> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| is_expected(&token.token).then_some(token.span))
        .context(Context::Label(label))
        .parse_next(input)
}

fn colon<'src>(input: &mut Input<'src>) -> IResult<Span> {
    expect(input, |t| matches!(t, Token::Colon), "`:`")
}

fn comma<'src>(input: &mut Input<'src>) -> IResult<Span> {
    expect(input, |t| matches!(t, Token::Comma), "`,`")
}

/// Parse a bare word.
///
/// The `direction` keyword is a plain word outside statement position, so
/// `string direction` is a valid attribute.
fn word<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::Identifier(name) => Some(Spanned::new(*name, token.span)),
        Token::Direction => Some(Spanned::new("direction", token.span)),
        _ => None,
    })
    .context(Context::Label("name"))
    .parse_next(input)
}

/// Returns `false` for attribute-only words such as `*id` or `varchar(255)`.
fn is_plain_name(name: &str) -> bool {
    !name.starts_with('*') && !name.contains('(')
}

/// Parse a bare word or a quoted string.
fn text<'src>(input: &mut Input<'src>, label: &'static str) -> IResult<Spanned<String>> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::Identifier(name) if is_plain_name(name) => {
            Some(Spanned::new(name.to_string(), token.span))
        }
        Token::StringLiteral(s) => Some(Spanned::new(s.clone(), token.span)),
        _ => None,
    })
    .context(Context::Label(label))
    .parse_next(input)
}

fn entity_name<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    text(input, "entity name")
}

fn string_literal<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::StringLiteral(s) => Some(Spanned::new(s.clone(), token.span)),
        _ => None,
    })
    .context(Context::Label("string literal"))
    .parse_next(input)
}

/// Parse `direction TB`. The value is checked during elaboration.
fn direction_statement<'src>(input: &mut Input<'src>) -> IResult<types::Statement<'src>> {
    expect(input, |t| matches!(t, Token::Direction), "`direction`")?;

    cut_err(input, |input| {
        let value = word.parse_next(input)?;
        Ok(types::Statement::Direction(value))
    })
}

/// Parse `accTitle: ...` or `accDescr ...`.
fn accessibility_statement<'src>(input: &mut Input<'src>) -> IResult<types::Statement<'src>> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::AccTitle(title) => Some(types::Statement::AccTitle(Spanned::new(title, token.span))),
        Token::AccDescr(description) => Some(types::Statement::AccDescr(Spanned::new(
            description,
            token.span,
        ))),
        _ => None,
    })
    .context(Context::Label("accessibility statement"))
    .parse_next(input)
}

/// Parse `["Alias"]` or `[Alias]`
fn alias<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    expect(input, |t| matches!(t, Token::LeftBracket), "`[`")?;

    cut_err(input, |input| {
        let alias = text(input, "alias")?;
        expect(input, |t| matches!(t, Token::RightBracket), "`]`")?;
        Ok(alias)
    })
}

/// Parse an attribute type, with an optional `[]` array suffix.
fn attribute_type<'src>(input: &mut Input<'src>) -> IResult<Spanned<String>> {
    let base = word.parse_next(input)?;

    let array_suffix = opt(|input: &mut Input<'src>| {
        let open = expect(input, |t| matches!(t, Token::LeftBracket), "`[`")?;
        let close = expect(input, |t| matches!(t, Token::RightBracket), "`]`")?;
        Ok(open.union(close))
    })
    .parse_next(input)?;

    Ok(match array_suffix {
        Some(span) => Spanned::new(format!("{}[]", base.inner()), base.span().union(span)),
        None => base.map(|name| name.to_string()),
    })
}

/// Parse a key modifier that can open a key list.
fn key_modifier<'src>(input: &mut Input<'src>) -> IResult<Spanned<&'src str>> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match &token.token {
        Token::Identifier(name) if matches!(*name, "PK" | "FK" | "UK") => {
            Some(Spanned::new(*name, token.span))
        }
        _ => None,
    })
    .context(Context::Label("key modifier"))
    .parse_next(input)
}

/// Parse `PK, FK`. Anything after a comma is taken as a key and checked later.
fn key_list<'src>(input: &mut Input<'src>) -> IResult<Vec<Spanned<&'src str>>> {
    let first = key_modifier.parse_next(input)?;

    let rest: Vec<Spanned<&'src str>> = repeat(
        0..,
        preceded(comma, |input: &mut Input<'src>| cut_err(input, word)),
    )
    .parse_next(input)?;

    let mut keys = Vec::with_capacity(rest.len() + 1);
    keys.push(first);
    keys.extend(rest);
    Ok(keys)
}

/// Parse `type name [keys] ["comment"]`
fn attribute<'src>(input: &mut Input<'src>) -> IResult<types::AttributeDecl<'src>> {
    let ty = attribute_type.parse_next(input)?;

    cut_err(input, |input| {
        let name = word.parse_next(input)?;
        let keys = opt(key_list).parse_next(input)?.unwrap_or_default();
        let comment = opt(string_literal).parse_next(input)?;

        Ok(types::AttributeDecl {
            ty,
            name,
            keys,
            comment,
        })
    })
}

/// Parse `{ attribute* }`
fn attribute_block<'src>(input: &mut Input<'src>) -> IResult<Vec<types::AttributeDecl<'src>>> {
    expect(input, |t| matches!(t, Token::LeftBrace), "`{`")?;

    cut_err(input, |input| {
        let attributes: Vec<_> = repeat(0.., attribute).parse_next(input)?;
        expect(input, |t| matches!(t, Token::RightBrace), "`}`")?;
        Ok(attributes)
    })
}

fn relationship_operator<'src>(
    input: &mut Input<'src>,
) -> IResult<(Cardinality, Cardinality, bool)> {
    trivia0.parse_next(input)?;
    any.verify_map(|token: &PositionedToken<'_>| match token.token {
        Token::Relationship {
            left,
            right,
            identifying,
        } => Some((left, right, identifying)),
        _ => None,
    })
    .context(Context::Label("relationship operator"))
    .parse_next(input)
}

/// Word-form cardinalities. Longer phrases come first.
const WORD_CARDINALITIES: &[(&[&str], Cardinality)] = &[
    (&["one", "or", "zero"], Cardinality::ZeroOrOne),
    (&["zero", "or", "one"], Cardinality::ZeroOrOne),
    (&["one", "or", "more"], Cardinality::OneOrMore),
    (&["one", "or", "many"], Cardinality::OneOrMore),
    (&["zero", "or", "more"], Cardinality::ZeroOrMore),
    (&["zero", "or", "many"], Cardinality::ZeroOrMore),
    (&["only", "one"], Cardinality::ExactlyOne),
    (&["many(0)"], Cardinality::ZeroOrMore),
    (&["many(1)"], Cardinality::OneOrMore),
    (&["many"], Cardinality::ZeroOrMore),
    (&["one"], Cardinality::ExactlyOne),
    (&["1+"], Cardinality::OneOrMore),
    (&["0+"], Cardinality::ZeroOrMore),
    (&["1"], Cardinality::ExactlyOne),
];

/// `to` is identifying, `optionally to` is not.
const WORD_LINES: &[(&[&str], bool)] = &[(&["optionally", "to"], false), (&["to"], true)];

/// Skip spaces and tabs but not line breaks.
fn inline_space<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.token == Token::Whitespace)
            .void(),
    )
    .parse_next(input)
}

/// Match `expected` on the current line, ignoring ASCII case.
fn inline_word<'src>(input: &mut Input<'src>, expected: &str) -> IResult<()> {
    inline_space.parse_next(input)?;
    any.verify(|token: &PositionedToken<'_>| match &token.token {
        Token::Identifier(word) | Token::Quantity(word) => word.eq_ignore_ascii_case(expected),
        _ => false,
    })
    .void()
    .parse_next(input)
}

/// Match the first phrase of `table` whose words all follow on this line.
fn phrase<'src, T: Copy>(input: &mut Input<'src>, table: &[(&[&str], T)]) -> IResult<T> {
    for (words, value) in table {
        let checkpoint = input.checkpoint();
        if words.iter().all(|word| inline_word(input, word).is_ok()) {
            return Ok(*value);
        }
        input.reset(&checkpoint);
    }
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Parse a word-form operator such as `1 to zero or more` or
/// `one optionally to many`. The whole operator sits on one line.
fn word_relationship_operator<'src>(
    input: &mut Input<'src>,
) -> IResult<(Cardinality, Cardinality, bool)> {
    let left = phrase(input, WORD_CARDINALITIES)?;
    let identifying = phrase(input, WORD_LINES)?;
    let right = phrase(input, WORD_CARDINALITIES)?;
    Ok((left, right, identifying))
}

/// Parse an entity declaration or a relationship.
///
/// Both start with an entity name; a relationship operator after the name
/// commits to the relationship form.
fn entity_or_relationship<'src>(input: &mut Input<'src>) -> IResult<types::Statement<'src>> {
    let name = entity_name.parse_next(input)?;

    if let Some((left_cardinality, right_cardinality, identifying)) =
        opt(alt((relationship_operator, word_relationship_operator))).parse_next(input)?
    {
        return cut_err(input, |input| {
            let right = entity_name.parse_next(input)?;
            colon.parse_next(input)?;
            let label = text(input, "relationship label")?;

            Ok(types::Statement::Relationship(types::RelationshipDecl {
                left: name,
                left_cardinality,
                right_cardinality,
                identifying,
                right,
                label,
            }))
        });
    }

    let alias = opt(alias).parse_next(input)?;
    let attributes = opt(attribute_block).parse_next(input)?.unwrap_or_default();

    Ok(types::Statement::Entity(types::EntityDecl {
        name,
        alias,
        attributes,
    }))
}

fn statement<'src>(input: &mut Input<'src>) -> IResult<types::Statement<'src>> {
    alt((
        direction_statement,
        accessibility_statement,
        entity_or_relationship,
    ))
    .parse_next(input)
}

/// Parse a complete document
fn document<'src>(input: &mut Input<'src>) -> IResult<types::Document<'src>> {
    expect(input, |t| matches!(t, Token::ErDiagram), "`erDiagram`")?;
    let statements: Vec<_> = repeat(0.., statement).parse_next(input)?;
    trivia0.parse_next(input)?;

    if !input.is_empty() {
        return Err(cut_error_with_offset(input));
    }

    Ok(types::Document { statements })
}

/// Span covering the first through last non-trivia token of `tokens`.
fn meaningful_span(tokens: &[PositionedToken<'_>]) -> Option<Span> {
    let mut spans = tokens
        .iter()
        .filter(|t| !t.token.is_trivia())
        .map(|t| t.span);
    let first = spans.next()?;
    Some(spans.last().map_or(first, |last| first.union(last)))
}

/// Convert winnow errors to a diagnostic.
///
/// The failing token position comes from the remaining token count, and the
/// start of the failing construct from the innermost `StartOffset` context.
fn convert_error(
    error: ErrMode<ContextError<Context>>,
    tokens: &[PositionedToken],
    current_remaining: usize,
) -> Diagnostic {
    let context = match error {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    let start_remaining = context.context().find_map(|ctx| match ctx {
        Context::StartOffset(n) => Some(*n),
        _ => None,
    });
    let expected: Vec<&str> = context
        .context()
        .filter_map(|ctx| match ctx {
            Context::Label(label) => Some(*label),
            _ => None,
        })
        .collect();

    let end_offset = tokens.len().saturating_sub(current_remaining);
    let start_offset = start_remaining.map_or(end_offset, |r| tokens.len().saturating_sub(r));
    let construct_span = if start_offset < end_offset {
        meaningful_span(&tokens[start_offset..end_offset])
    } else {
        None
    };

    let label = if expected.is_empty() {
        "unexpected token".to_string()
    } else {
        format!("expected {}", expected.join(" or "))
    };

    let offending = tokens[end_offset.min(tokens.len())..]
        .iter()
        .find(|t| !t.token.is_trivia());

    let diagnostic = match offending {
        Some(token) => Diagnostic::error(format!("unexpected token `{}`", token.token))
            .with_code(ErrorCode::E100)
            .with_label(token.span, label)
            .with_help("each line holds one entity, relationship or `direction` statement"),
        None => {
            let last = tokens
                .iter()
                .rev()
                .find(|t| !t.token.is_trivia())
                .map(|t| t.span)
                .unwrap_or_default();
            Diagnostic::error("incomplete input, more tokens expected")
                .with_code(ErrorCode::E101)
                .with_label(Span::new(last.end()..last.end()), label)
                .with_help("the markup ends in the middle of a statement")
        }
    };

    match construct_span {
        Some(span) => diagnostic.with_secondary_label(span, "while parsing this"),
        None => diagnostic,
    }
}

/// Build a document from tokens.
///
/// The first meaningful token must be `erDiagram`; empty markup is
/// incomplete input.
pub fn build_document<'src>(
    tokens: &'src [PositionedToken<'src>],
) -> Result<types::Document<'src>, Diagnostic> {
    match tokens.iter().find(|t| !t.token.is_trivia()) {
        None => {
            return Err(Diagnostic::error("empty diagram markup")
                .with_code(ErrorCode::E101)
                .with_label(Span::default(), "nothing to parse")
                .with_help("start the markup with `erDiagram`"));
        }
        Some(first) if first.token != Token::ErDiagram => {
            return Err(Diagnostic::error("missing `erDiagram` declaration")
                .with_code(ErrorCode::E102)
                .with_label(first.span, "expected `erDiagram` here")
                .with_help("start the markup with `erDiagram`"));
        }
        Some(_) => {}
    }

    let mut token_slice = TokenSlice::new(tokens);

    document.parse_next(&mut token_slice).map_err(|e| {
        let current_remaining = token_slice.eof_offset();
        convert_error(e, tokens, current_remaining)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_tokens(input: &str) -> Vec<PositionedToken<'_>> {
        tokenize(input).expect("Failed to tokenize input")
    }

    fn parse_document(input: &str) -> Result<Vec<types::Statement<'_>>, Diagnostic> {
        let tokens: &[PositionedToken<'_>] = Box::leak(parse_tokens(input).into_boxed_slice());
        build_document(tokens).map(|doc| doc.statements)
    }

    #[test]
    fn test_word_accepts_direction_keyword() {
        let tokens = parse_tokens("direction");
        let mut slice = TokenSlice::new(&tokens);
        let result = word.parse_next(&mut slice).unwrap();
        assert_eq!(*result.inner(), "direction");
    }

    #[test]
    fn test_text_accepts_identifier_and_string() {
        let tokens = parse_tokens("CUSTOMER \"Line Item\"");
        let mut slice = TokenSlice::new(&tokens);

        assert_eq!(entity_name.parse_next(&mut slice).unwrap().inner(), "CUSTOMER");
        assert_eq!(entity_name.parse_next(&mut slice).unwrap().inner(), "Line Item");
    }

    #[test]
    fn test_attribute_type_with_array_suffix() {
        let tokens = parse_tokens("string[] tags");
        let mut slice = TokenSlice::new(&tokens);

        let attribute = attribute.parse_next(&mut slice).unwrap();
        assert_eq!(attribute.ty.inner(), "string[]");
        assert_eq!(*attribute.name.inner(), "tags");
        assert!(attribute.keys.is_empty());
    }

    #[test]
    fn test_attribute_with_keys_and_comment() {
        let tokens = parse_tokens("int customer_id PK, FK \"owner\"");
        let mut slice = TokenSlice::new(&tokens);

        let attribute = attribute.parse_next(&mut slice).unwrap();
        let keys: Vec<&str> = attribute.keys.iter().map(|k| *k.inner()).collect();
        assert_eq!(keys, vec!["PK", "FK"]);
        assert_eq!(attribute.comment.unwrap().inner(), "owner");
    }

    #[test]
    fn test_key_after_comma_is_kept_for_elaboration() {
        let tokens = parse_tokens("int id PK, PRIMARY");
        let mut slice = TokenSlice::new(&tokens);

        let attribute = attribute.parse_next(&mut slice).unwrap();
        assert_eq!(*attribute.keys[1].inner(), "PRIMARY");
    }

    #[test]
    fn test_consecutive_attributes_are_not_keys() {
        let statements = parse_document("erDiagram\nUSER {\n  int id PK\n  string name\n}").unwrap();

        let types::Statement::Entity(entity) = &statements[0] else {
            panic!("expected entity, got {:?}", statements[0]);
        };
        assert_eq!(entity.attributes.len(), 2);
        assert_eq!(*entity.attributes[1].name.inner(), "name");
    }

    #[test]
    fn test_relationship_statement() {
        let statements = parse_document("erDiagram\n  CUSTOMER ||--o{ ORDER : places").unwrap();

        assert_eq!(statements.len(), 1);
        let types::Statement::Relationship(rel) = &statements[0] else {
            panic!("expected relationship, got {:?}", statements[0]);
        };
        assert_eq!(rel.left.inner(), "CUSTOMER");
        assert_eq!(rel.right.inner(), "ORDER");
        assert_eq!(rel.left_cardinality, Cardinality::ExactlyOne);
        assert_eq!(rel.right_cardinality, Cardinality::ZeroOrMore);
        assert!(rel.identifying);
        assert_eq!(rel.label.inner(), "places");
    }

    #[test]
    fn test_entity_with_alias() {
        let statements = parse_document("erDiagram\np[\"Person\"] {\n string name\n}").unwrap();

        let types::Statement::Entity(entity) = &statements[0] else {
            panic!("expected entity, got {:?}", statements[0]);
        };
        assert_eq!(entity.name.inner(), "p");
        assert_eq!(entity.alias.as_ref().unwrap().inner(), "Person");
    }

    #[test]
    fn test_direction_statement() {
        let statements = parse_document("erDiagram\ndirection LR").unwrap();
        assert!(matches!(&statements[0], types::Statement::Direction(d) if *d.inner() == "LR"));
    }

    #[test]
    fn test_semicolons_and_comments_are_trivia() {
        let statements =
            parse_document("%% header\nerDiagram; A ||--|| B : has; %% trailing\nC").unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_missing_header() {
        let err = parse_document("CUSTOMER ||--o{ ORDER : places").unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::E102));
        assert_eq!(err.labels()[0].span(), Span::new(0..8));
    }

    #[test]
    fn test_empty_input() {
        let err = parse_document("  \n %% nothing\n").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_missing_label_is_incomplete() {
        let err = parse_document("erDiagram\nA ||--o{ B :").unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::E101));
        assert!(err.labels()[0].message().contains("relationship label"));
    }

    #[test]
    fn test_missing_colon_is_unexpected_token() {
        let err = parse_document("erDiagram\nA ||--o{ B places").unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert_eq!(err.message(), "unexpected token `places`");
    }

    #[test]
    fn test_unclosed_attribute_block() {
        let err = parse_document("erDiagram\nA {\n int id\n").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::E101));
    }

    #[test]
    fn test_stray_token_after_statements() {
        let err = parse_document("erDiagram\nA\n: B").unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::E100));
        assert_eq!(err.labels()[0].span().start(), 12);
    }
}
