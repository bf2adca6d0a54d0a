//! Semantic entity-relationship model.
//!
//! This module contains the representation of a diagram after parsing and
//! elaboration. Repeated entity declarations are already merged and every
//! relationship endpoint is guaranteed to name a declared entity.
//!
//! # Pipeline Position
//!
//! ```text
//! Source Text
//!     ↓ lexer
//! Tokens
//!     ↓ parser
//! Parser AST (parser_types) - syntactic structure with spans
//!     ↓ elaborate
//! Semantic Model (these types) - merged entities, resolved endpoints
//!     ↓ Display
//! Canonical markup
//! ```

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

/// The keyword every diagram source must start with.
pub const DIAGRAM_KEYWORD: &str = "erDiagram";

/// Layout direction hint carried by a `direction` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    /// Returns the markup keyword for this direction (e.g. `LR`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopBottom => "TB",
            Direction::BottomTop => "BT",
            Direction::LeftRight => "LR",
            Direction::RightLeft => "RL",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TB" | "TD" => Ok(Direction::TopBottom),
            "BT" => Ok(Direction::BottomTop),
            "LR" => Ok(Direction::LeftRight),
            "RL" => Ok(Direction::RightLeft),
            other => Err(format!("unknown direction `{other}`")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many instances of an entity may take part in a relationship.
///
/// The crow's foot notation spells each cardinality differently depending on
/// which side of the relationship line it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ZeroOrOne,
    ExactlyOne,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    /// Symbol used when the cardinality sits left of the line (e.g. `}o`).
    pub fn left_symbol(&self) -> &'static str {
        match self {
            Cardinality::ZeroOrOne => "|o",
            Cardinality::ExactlyOne => "||",
            Cardinality::ZeroOrMore => "}o",
            Cardinality::OneOrMore => "}|",
        }
    }

    /// Symbol used when the cardinality sits right of the line (e.g. `o{`).
    pub fn right_symbol(&self) -> &'static str {
        match self {
            Cardinality::ZeroOrOne => "o|",
            Cardinality::ExactlyOne => "||",
            Cardinality::ZeroOrMore => "o{",
            Cardinality::OneOrMore => "|{",
        }
    }

    /// Returns `true` if more than one instance may participate.
    pub fn is_many(&self) -> bool {
        matches!(self, Cardinality::ZeroOrMore | Cardinality::OneOrMore)
    }
}

/// Key modifier attached to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Primary,
    Foreign,
    Unique,
}

impl KeyKind {
    /// Returns the markup keyword for this key (`PK`, `FK` or `UK`).
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Primary => "PK",
            KeyKind::Foreign => "FK",
            KeyKind::Unique => "UK",
        }
    }
}

impl FromStr for KeyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PK" => Ok(KeyKind::Primary),
            "FK" => Ok(KeyKind::Foreign),
            "UK" => Ok(KeyKind::Unique),
            other => Err(format!("unknown key modifier `{other}`")),
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    ty: String,
    name: String,
    keys: Vec<KeyKind>,
    comment: Option<String>,
}

impl Attribute {
    /// Creates an attribute with no keys and no comment.
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
            keys: Vec::new(),
            comment: None,
        }
    }

    /// Sets the key modifiers.
    pub fn with_keys(mut self, keys: Vec<KeyKind>) -> Self {
        self.keys = keys;
        self
    }

    /// Sets the trailing comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[KeyKind] {
        &self.keys
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns `true` if the attribute is (part of) the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.keys.contains(&KeyKind::Primary)
    }
}

/// An entity (table) with its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    name: String,
    alias: Option<String>,
    attributes: Vec<Attribute>,
}

impl Entity {
    /// Creates an entity with no alias and no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the alias if one is set, the name otherwise.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Sets the display alias. A later alias replaces an earlier one.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if let Some(previous) = self.alias.as_deref() {
            if previous != alias {
                debug!(
                    entity = self.name.as_str(),
                    previous = previous,
                    alias = alias.as_str();
                    "Entity alias replaced"
                );
            }
        }
        self.alias = Some(alias);
    }

    /// Appends an attribute.
    pub fn push_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }
}

/// A relationship line between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    left: String,
    right: String,
    left_cardinality: Cardinality,
    right_cardinality: Cardinality,
    identifying: bool,
    label: String,
}

impl Relationship {
    /// Creates a relationship between `left` and `right`.
    ///
    /// `identifying` selects a solid (`--`) rather than a dashed (`..`) line.
    pub fn new(
        left: impl Into<String>,
        left_cardinality: Cardinality,
        right_cardinality: Cardinality,
        right: impl Into<String>,
        identifying: bool,
        label: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            left_cardinality,
            right_cardinality,
            identifying,
            label: label.into(),
        }
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }

    pub fn left_cardinality(&self) -> Cardinality {
        self.left_cardinality
    }

    pub fn right_cardinality(&self) -> Cardinality {
        self.right_cardinality
    }

    pub fn is_identifying(&self) -> bool {
        self.identifying
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if both sides allow many instances.
    pub fn is_many_to_many(&self) -> bool {
        self.left_cardinality.is_many() && self.right_cardinality.is_many()
    }
}

/// A fully elaborated entity-relationship diagram.
///
/// Entities keep their first-declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErDiagram {
    direction: Option<Direction>,
    accessible_title: Option<String>,
    accessible_description: Option<String>,
    entities: IndexMap<String, Entity>,
    relationships: Vec<Relationship>,
}

impl ErDiagram {
    /// Creates an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    /// The `accTitle` text, if any.
    pub fn accessible_title(&self) -> Option<&str> {
        self.accessible_title.as_deref()
    }

    pub fn set_accessible_title(&mut self, title: impl Into<String>) {
        self.accessible_title = Some(title.into());
    }

    /// The `accDescr` text, if any. May span several lines.
    pub fn accessible_description(&self) -> Option<&str> {
        self.accessible_description.as_deref()
    }

    pub fn set_accessible_description(&mut self, description: impl Into<String>) {
        self.accessible_description = Some(description.into());
    }

    /// Iterates entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Looks up an entity by name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Returns the entity called `name`, declaring it first if needed.
    pub fn declare_entity(&mut self, name: impl Into<String>) -> &mut Entity {
        let name = name.into();
        self.entities
            .entry(name)
            .or_insert_with_key(|name| Entity::new(name.clone()))
    }

    /// Adds a relationship, declaring both endpoints if they are new.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.declare_entity(relationship.left.clone());
        self.declare_entity(relationship.right.clone());
        self.relationships.push(relationship);
    }
}

/// Returns `true` if `name` can be written without quotes.
fn is_bare_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !matches!(name, DIAGRAM_KEYWORD | "direction" | "accTitle" | "accDescr")
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_name(name) {
        f.write_str(name)
    } else {
        write!(f, "\"{name}\"")
    }
}

impl fmt::Display for ErDiagram {
    /// Writes the diagram as canonical `erDiagram` markup.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{DIAGRAM_KEYWORD}")?;

        if let Some(title) = self.accessible_title() {
            writeln!(f, "    accTitle: {title}")?;
        }
        match self.accessible_description() {
            Some(description) if description.contains('\n') => {
                writeln!(f, "    accDescr {{")?;
                for line in description.lines() {
                    writeln!(f, "        {}", line.trim())?;
                }
                writeln!(f, "    }}")?;
            }
            Some(description) => writeln!(f, "    accDescr: {description}")?,
            None => {}
        }

        if let Some(direction) = self.direction {
            writeln!(f, "    direction {direction}")?;
        }

        for entity in self.entities.values() {
            f.write_str("    ")?;
            write_name(f, entity.name())?;
            if let Some(alias) = entity.alias() {
                write!(f, "[\"{alias}\"]")?;
            }
            if entity.attributes().is_empty() {
                writeln!(f)?;
                continue;
            }

            writeln!(f, " {{")?;
            for attribute in entity.attributes() {
                write!(f, "        {} {}", attribute.ty(), attribute.name())?;
                if !attribute.keys().is_empty() {
                    let keys: Vec<&str> = attribute.keys().iter().map(KeyKind::as_str).collect();
                    write!(f, " {}", keys.join(", "))?;
                }
                if let Some(comment) = attribute.comment() {
                    write!(f, " \"{comment}\"")?;
                }
                writeln!(f)?;
            }
            writeln!(f, "    }}")?;
        }

        for relationship in &self.relationships {
            f.write_str("    ")?;
            write_name(f, relationship.left())?;
            write!(
                f,
                " {}{}{} ",
                relationship.left_cardinality().left_symbol(),
                if relationship.is_identifying() { "--" } else { ".." },
                relationship.right_cardinality().right_symbol(),
            )?;
            write_name(f, relationship.right())?;
            f.write_str(" : ")?;
            write_name(f, relationship.label())?;
            writeln!(f)?;
        }

        Ok(())
    }
}
