//! Markup sanitizer.
//!
//! Models wrap diagrams in code fences, prepend commentary, use accented
//! letters and sprinkle parenthesized notes over attribute types. None of
//! that is valid grammar. [`sanitize`] normalizes raw model output into
//! markup the oracle can judge:
//!
//! 1. Strip code fences together with their language tag
//! 2. Fold accented letters to ASCII
//! 3. Remove parenthesized annotations
//! 4. Trim surrounding whitespace
//! 5. Drop everything before the `erDiagram` keyword
//!
//! Steps 1 to 3 repeat until the text stops changing, which makes the whole
//! function idempotent.

use std::{borrow::Cow, sync::LazyLock};

use log::trace;
use regex::{Captures, Regex};

use ergen_core::semantic::DIAGRAM_KEYWORD;

/// A backtick run of three or more and the word attached to it.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`{3,}(\w*)").expect("valid fence pattern"));

/// Non-greedy, single line.
static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)").expect("valid annotation pattern"));

/// Normalize raw model output into candidate diagram markup.
///
/// # Example
///
/// ```
/// # use ergen::sanitize::sanitize;
/// let raw = "Sure! Here it is:\n```mermaid\nerDiagram\n    AÑO ||--o{ CLASE : tiene\n```";
/// assert_eq!(sanitize(raw), "erDiagram\n    ANO ||--o{ CLASE : tiene");
/// ```
pub fn sanitize(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let next = strip_annotations(&fold_diacritics(&strip_code_fences(&text))).into_owned();
        if next == text {
            break;
        }
        text = next;
    }

    let text = text.trim();
    let text = match text.find(DIAGRAM_KEYWORD) {
        Some(start) => &text[start..],
        None => text,
    };
    trace!(raw_bytes = raw.len(), bytes = text.len(); "Sanitized model output");
    text.to_string()
}

/// Remove code fences and their language tags.
///
/// When the diagram keyword is glued to the fence (`` ```erDiagram ``) the
/// keyword and whatever follows it are kept.
pub fn strip_code_fences(text: &str) -> Cow<'_, str> {
    CODE_FENCE.replace_all(text, |caps: &Captures<'_>| {
        let tag = &caps[1];
        match tag.find(DIAGRAM_KEYWORD) {
            Some(start) => tag[start..].to_string(),
            None => String::new(),
        }
    })
}

fn strip_annotations(text: &str) -> Cow<'_, str> {
    ANNOTATION.replace_all(text, "")
}

fn fold_diacritics(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }

    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match fold_char(c) {
            Some(replacement) => folded.push_str(replacement),
            None => folded.push(c),
        }
    }
    Cow::Owned(folded)
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => "a",
        'Á' | 'À' | 'Ä' | 'Â' | 'Ã' | 'Å' => "A",
        'é' | 'è' | 'ë' | 'ê' => "e",
        'É' | 'È' | 'Ë' | 'Ê' => "E",
        'í' | 'ì' | 'ï' | 'î' => "i",
        'Í' | 'Ì' | 'Ï' | 'Î' => "I",
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => "o",
        'Ó' | 'Ò' | 'Ö' | 'Ô' | 'Õ' => "O",
        'ú' | 'ù' | 'ü' | 'û' => "u",
        'Ú' | 'Ù' | 'Ü' | 'Û' => "U",
        'ñ' => "n",
        'Ñ' => "N",
        'ç' => "c",
        'Ç' => "C",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fences_and_commentary() {
        let raw = "Here is your diagram:\n\n```mermaid\nerDiagram\n    A ||--o{ B : has\n```\nEnjoy!";
        assert_eq!(sanitize(raw), "erDiagram\n    A ||--o{ B : has\n\nEnjoy!");
    }

    #[test]
    fn test_keeps_diagram_keyword_fence_tag() {
        assert_eq!(sanitize("```erDiagram\n    A\n```"), "erDiagram\n    A");
        assert_eq!(strip_code_fences("```mermaid_erDiagram"), "erDiagram");
    }

    #[test]
    fn test_folds_diacritics() {
        assert_eq!(
            sanitize("erDiagram\n    CANCIÓN }o--|| ÁLBUM : pertenece"),
            "erDiagram\n    CANCION }o--|| ALBUM : pertenece"
        );
        assert_eq!(fold_diacritics("Ñandú ç"), "Nandu c");
        // Unknown non-ASCII letters are left for the oracle to reject
        assert_eq!(fold_diacritics("Straße"), "Straße");
    }

    #[test]
    fn test_strips_annotations() {
        let raw = "erDiagram\n    USER {\n        varchar(255) email (unique)\n    }";
        assert_eq!(sanitize(raw), "erDiagram\n    USER {\n        varchar email \n    }");
    }

    #[test]
    fn test_annotation_does_not_span_lines() {
        assert_eq!(strip_annotations("a (b\nc) d"), "a (b\nc) d");
        assert_eq!(strip_annotations("a (b (c) d)"), "a  d)");
    }

    #[test]
    fn test_removal_exposing_fence_reaches_fixed_point() {
        // Dropping the annotation joins the backticks into a fence
        assert_eq!(sanitize("erDiagram ``(note)`mermaid"), "erDiagram");
    }

    #[test]
    fn test_without_keyword_only_trims() {
        assert_eq!(sanitize("  graph TD\n A --> B  "), "graph TD\n A --> B");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_school_example_becomes_valid() {
        let raw = "```mermaid\nerDiagram\n    ESTUDIANTE }o--o{ CURSO : inscrito\n    PROFESOR ||--o{ CURSO : enseña (principal)\n```";
        let markup = sanitize(raw);

        assert!(ergen_parser::parse(&markup).is_ok(), "{markup}");
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn arbitrary_text() -> impl Strategy<Value = String> {
            prop_oneof![
                any::<String>(),
                "[a-zA-Z0-9 \n`(){}|:ñáéÓü-]{0,80}",
                "(```[a-z]{0,8}\n)?(Intro \\(x\\) )?erDiagram\n[A-Z_ ()|o{}:-]{0,40}(\n```)?",
            ]
        }

        fn text_without_parens() -> impl Strategy<Value = String> {
            "[^()]{0,40}"
        }

        fn check_idempotent(raw: &str) -> Result<(), TestCaseError> {
            let once = sanitize(raw);
            let twice = sanitize(&once);
            prop_assert_eq!(once, twice);
            Ok(())
        }

        fn check_starts_at_keyword(prefix: &str, suffix: &str) -> Result<(), TestCaseError> {
            let raw = format!("{prefix}{DIAGRAM_KEYWORD}{suffix}");
            let sanitized = sanitize(&raw);
            prop_assert!(
                sanitized.starts_with(DIAGRAM_KEYWORD),
                "{:?} sanitized to {:?}",
                raw,
                sanitized
            );
            Ok(())
        }

        fn check_deterministic(raw: &str) -> Result<(), TestCaseError> {
            prop_assert_eq!(sanitize(raw), sanitize(raw));
            Ok(())
        }

        proptest! {
            #[test]
            fn sanitize_is_idempotent(raw in arbitrary_text()) {
                check_idempotent(&raw)?;
            }

            #[test]
            fn sanitize_starts_at_keyword(prefix in text_without_parens(), suffix in text_without_parens()) {
                check_starts_at_keyword(&prefix, &suffix)?;
            }

            #[test]
            fn sanitize_is_deterministic(raw in arbitrary_text()) {
                check_deterministic(&raw)?;
            }
        }
    }
}
