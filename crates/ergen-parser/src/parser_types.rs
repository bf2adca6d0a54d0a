//! Syntax tree produced by the [`parser`](super::parser).
//!
//! Names are kept as written, key modifiers and directions as raw text;
//! elaboration checks them and builds the semantic model.

use ergen_core::semantic::Cardinality;

use crate::span::Spanned;

/// A parsed `erDiagram` document.
#[derive(Debug, Clone)]
pub struct Document<'src> {
    pub statements: Vec<Statement<'src>>,
}

#[derive(Debug, Clone)]
pub enum Statement<'src> {
    /// `direction LR`
    Direction(Spanned<&'src str>),
    /// `accTitle: text`
    AccTitle(Spanned<&'src str>),
    /// `accDescr: text` or `accDescr { text }`
    AccDescr(Spanned<&'src str>),
    Entity(EntityDecl<'src>),
    Relationship(RelationshipDecl),
}

/// `NAME["Alias"] { attributes }`; alias and block are both optional.
#[derive(Debug, Clone)]
pub struct EntityDecl<'src> {
    pub name: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub attributes: Vec<AttributeDecl<'src>>,
}

/// `type name PK, FK "comment"`
#[derive(Debug, Clone)]
pub struct AttributeDecl<'src> {
    pub ty: Spanned<String>,
    pub name: Spanned<&'src str>,
    pub keys: Vec<Spanned<&'src str>>,
    pub comment: Option<Spanned<String>>,
}

/// `LEFT ||--o{ RIGHT : label`
#[derive(Debug, Clone)]
pub struct RelationshipDecl {
    pub left: Spanned<String>,
    pub left_cardinality: Cardinality,
    pub right_cardinality: Cardinality,
    pub identifying: bool,
    pub right: Spanned<String>,
    pub label: Spanned<String>,
}
