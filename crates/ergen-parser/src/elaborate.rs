//! Elaboration phase
//!
//! Builds the semantic [`ErDiagram`] from the parsed document. Repeated entity
//! declarations merge, and entities named only in relationships are created
//! on first mention. Key modifiers and directions are checked here, so every
//! invalid one in the document is reported together.

use std::{collections::HashMap, str::FromStr};

use log::{debug, trace};

use ergen_core::semantic::{Attribute, Direction, ErDiagram, KeyKind, Relationship};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    parser_types as types,
    span::{Span, Spanned},
};

#[derive(Default)]
pub struct Builder {
    diagram: ErDiagram,
    diagnostics: DiagnosticCollector,
    direction_span: Option<Span>,
    /// First declaration of each `(entity, attribute)` pair
    attribute_spans: HashMap<(String, String), Span>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elaborate a document, returning the diagram and any warnings.
    pub fn build(
        mut self,
        document: &types::Document<'_>,
    ) -> Result<(ErDiagram, Vec<Diagnostic>), ParseError> {
        debug!(statements = document.statements.len(); "Elaborating erDiagram");

        for statement in &document.statements {
            match statement {
                types::Statement::Direction(value) => self.build_direction(value),
                types::Statement::AccTitle(title) => {
                    self.diagram.set_accessible_title(*title.inner());
                }
                types::Statement::AccDescr(description) => {
                    let lines: Vec<&str> = description.lines().map(str::trim).collect();
                    self.diagram.set_accessible_description(lines.join("\n"));
                }
                types::Statement::Entity(entity) => self.build_entity(entity),
                types::Statement::Relationship(relationship) => {
                    self.build_relationship(relationship)
                }
            }
        }

        let warnings = self.diagnostics.finish()?;
        debug!(
            entities = self.diagram.entity_count(),
            relationships = self.diagram.relationships().len(),
            warnings = warnings.len();
            "Elaboration completed",
        );
        Ok((self.diagram, warnings))
    }

    fn build_direction(&mut self, value: &Spanned<&str>) {
        let direction = match Direction::from_str(value.inner()) {
            Ok(direction) => direction,
            Err(_) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("invalid direction `{}`", value.inner()))
                        .with_code(ErrorCode::E104)
                        .with_label(value.span(), ErrorCode::E104.description())
                        .with_help("use one of `TB`, `BT`, `LR` or `RL`"),
                );
                return;
            }
        };

        if let Some(previous) = self.direction_span.replace(value.span()) {
            self.diagnostics.emit(
                Diagnostic::warning("direction set more than once")
                    .with_label(value.span(), "this direction wins")
                    .with_secondary_label(previous, "earlier direction ignored"),
            );
        }
        self.diagram.set_direction(direction);
    }

    fn build_entity(&mut self, decl: &types::EntityDecl<'_>) {
        trace!(entity = decl.name.inner().as_str(); "Building entity");

        let mut attributes = Vec::with_capacity(decl.attributes.len());
        for attribute in &decl.attributes {
            if let Some(attribute) = self.build_attribute(decl.name.inner(), attribute) {
                attributes.push(attribute);
            }
        }

        let entity = self.diagram.declare_entity(decl.name.inner().as_str());
        if let Some(alias) = &decl.alias {
            entity.set_alias(alias.inner().as_str());
        }
        for attribute in attributes {
            entity.push_attribute(attribute);
        }
    }

    fn build_attribute(
        &mut self,
        entity: &str,
        decl: &types::AttributeDecl<'_>,
    ) -> Option<Attribute> {
        let mut keys = Vec::with_capacity(decl.keys.len());
        let mut valid = true;
        for key in &decl.keys {
            match KeyKind::from_str(key.inner()) {
                Ok(kind) if keys.contains(&kind) => {
                    self.diagnostics.emit(
                        Diagnostic::warning(format!("key modifier `{kind}` repeated"))
                            .with_label(key.span(), "repeated here"),
                    );
                }
                Ok(kind) => keys.push(kind),
                Err(_) => {
                    valid = false;
                    self.diagnostics.emit(
                        Diagnostic::error(format!("unknown key modifier `{}`", key.inner()))
                            .with_code(ErrorCode::E103)
                            .with_label(key.span(), "not a key modifier")
                            .with_help("use `PK`, `FK` or `UK`"),
                    );
                }
            }
        }

        let name = decl.name.inner();
        let slot = (entity.to_string(), name.to_string());
        if let Some(first) = self.attribute_spans.get(&slot) {
            self.diagnostics.emit(
                Diagnostic::warning(format!("attribute `{name}` declared twice in `{entity}`"))
                    .with_label(decl.name.span(), "redeclared here")
                    .with_secondary_label(*first, "first declared here"),
            );
        } else {
            self.attribute_spans.insert(slot, decl.name.span());
        }

        if !valid {
            return None;
        }

        let mut attribute = Attribute::new(decl.ty.inner().as_str(), *name).with_keys(keys);
        if let Some(comment) = &decl.comment {
            attribute = attribute.with_comment(comment.inner().as_str());
        }
        Some(attribute)
    }

    fn build_relationship(&mut self, decl: &types::RelationshipDecl) {
        trace!(
            left = decl.left.inner().as_str(),
            right = decl.right.inner().as_str();
            "Building relationship",
        );

        self.diagram.add_relationship(Relationship::new(
            decl.left.inner().as_str(),
            decl.left_cardinality,
            decl.right_cardinality,
            decl.right.inner().as_str(),
            decl.identifying,
            decl.label.inner().as_str(),
        ));
    }
}
