//! Marking schema elements with a directive.
//!
//! The rewriter never touches its input: it clones the document and copy-on-writes only the
//! definitions that actually receive the directive. Elements already carrying the directive are
//! left as they are, so rewriting a rewritten document is a no-op.

use apollo_compiler::ast::{
    Definition, Directive, DirectiveList, Document, EnumTypeDefinition, EnumValueDefinition,
    FieldDefinition, InputObjectTypeDefinition, InputValueDefinition, InterfaceTypeDefinition,
    ObjectTypeDefinition, ScalarTypeDefinition, UnionTypeDefinition,
};
use apollo_compiler::{Name, Node};
use std::collections::BTreeSet;
use tracing::debug;

use crate::coordinate::SchemaCoordinate;
use crate::error::ContractError;

pub const DEFAULT_MARKER_DIRECTIVE: &str = "inaccessible";

/// Check that a configured directive name is a valid GraphQL name
pub fn parse_directive_name(directive_name: &str) -> Result<Name, ContractError> {
    Name::new(directive_name)
        .map_err(|_| ContractError::InvalidDirectiveName(directive_name.to_string()))
}

/// Adds an argument-less directive to selected types and members of a document
#[derive(Debug, Clone)]
pub struct DirectiveRewriter {
    directive_name: Name,
}

/// The output of a rewrite
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub document: Document,

    /// Coordinates that received the directive in this rewrite, in document order
    pub marked: Vec<SchemaCoordinate>,
}

impl DirectiveRewriter {
    pub fn new(directive_name: Name) -> Self {
        Self { directive_name }
    }

    /// Create a rewriter from a directive name given as text
    pub fn from_directive_name(directive_name: &str) -> Result<Self, ContractError> {
        parse_directive_name(directive_name).map(Self::new)
    }

    pub fn directive_name(&self) -> &Name {
        &self.directive_name
    }

    /// Mark every type definition whose name is not kept
    pub fn mark_types_except(&self, document: &Document, keep: impl Fn(&str) -> bool) -> Rewritten {
        self.rewrite(document, |coordinate| {
            coordinate.is_type() && !keep(coordinate.type_name())
        })
    }

    /// Mark exactly the given coordinates
    pub fn mark_coordinates(
        &self,
        document: &Document,
        coordinates: &BTreeSet<SchemaCoordinate>,
    ) -> Rewritten {
        self.rewrite(document, |coordinate| coordinates.contains(coordinate))
    }

    /// Mark every type definition, field, argument, enum value and input field accepted by the
    /// predicate.
    ///
    /// Types are only marked on their definition. Members are marked wherever they are declared,
    /// including type extensions.
    pub fn rewrite(
        &self,
        document: &Document,
        predicate: impl Fn(&SchemaCoordinate) -> bool,
    ) -> Rewritten {
        let mut document = document.clone();
        let mut marker = Marker {
            directive_name: &self.directive_name,
            predicate,
            marked: Vec::new(),
        };

        for definition in &mut document.definitions {
            match definition {
                Definition::ObjectTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                    if let Some(fields) = marker.mark_fields(&type_name, &def.fields) {
                        def.make_mut().fields = fields;
                    }
                }
                Definition::ObjectTypeExtension(ext) => {
                    if let Some(fields) = marker.mark_fields(&ext.name, &ext.fields) {
                        ext.make_mut().fields = fields;
                    }
                }
                Definition::InterfaceTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                    if let Some(fields) = marker.mark_fields(&type_name, &def.fields) {
                        def.make_mut().fields = fields;
                    }
                }
                Definition::InterfaceTypeExtension(ext) => {
                    if let Some(fields) = marker.mark_fields(&ext.name, &ext.fields) {
                        ext.make_mut().fields = fields;
                    }
                }
                Definition::InputObjectTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                    if let Some(fields) = marker.mark_members(&def.fields, |field| {
                        SchemaCoordinate::of_field(&type_name, &field.name)
                    }) {
                        def.make_mut().fields = fields;
                    }
                }
                Definition::InputObjectTypeExtension(ext) => {
                    let type_name = ext.name.clone();
                    if let Some(fields) = marker.mark_members(&ext.fields, |field| {
                        SchemaCoordinate::of_field(&type_name, &field.name)
                    }) {
                        ext.make_mut().fields = fields;
                    }
                }
                Definition::EnumTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                    if let Some(values) = marker.mark_members(&def.values, |value| {
                        SchemaCoordinate::of_enum_value(&type_name, &value.value)
                    }) {
                        def.make_mut().values = values;
                    }
                }
                Definition::EnumTypeExtension(ext) => {
                    let type_name = ext.name.clone();
                    if let Some(values) = marker.mark_members(&ext.values, |value| {
                        SchemaCoordinate::of_enum_value(&type_name, &value.value)
                    }) {
                        ext.make_mut().values = values;
                    }
                }
                Definition::UnionTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                }
                Definition::ScalarTypeDefinition(def) => {
                    let type_name = def.name.clone();
                    marker.mark(def, SchemaCoordinate::of_type(&type_name));
                }
                _ => {}
            }
        }

        debug!(
            directive = %self.directive_name,
            marked = marker.marked.len(),
            "Rewrote document"
        );
        Rewritten {
            document,
            marked: marker.marked,
        }
    }
}

/// AST nodes that carry a directive list
trait Directed: Clone {
    fn directives(&self) -> &DirectiveList;
    fn directives_mut(&mut self) -> &mut DirectiveList;
}

macro_rules! impl_directed {
    ($($node:ty),* $(,)?) => {
        $(
            impl Directed for $node {
                fn directives(&self) -> &DirectiveList {
                    &self.directives
                }

                fn directives_mut(&mut self) -> &mut DirectiveList {
                    &mut self.directives
                }
            }
        )*
    };
}

impl_directed!(
    ObjectTypeDefinition,
    InterfaceTypeDefinition,
    UnionTypeDefinition,
    EnumTypeDefinition,
    InputObjectTypeDefinition,
    ScalarTypeDefinition,
    FieldDefinition,
    InputValueDefinition,
    EnumValueDefinition,
);

struct Marker<'a, P> {
    directive_name: &'a Name,
    predicate: P,
    marked: Vec<SchemaCoordinate>,
}

impl<P: Fn(&SchemaCoordinate) -> bool> Marker<'_, P> {
    /// Mark a single node, returning whether it changed
    fn mark<T: Directed>(&mut self, node: &mut Node<T>, coordinate: SchemaCoordinate) -> bool {
        if node.directives().get(self.directive_name).is_some() || !(self.predicate)(&coordinate) {
            return false;
        }
        node.make_mut()
            .directives_mut()
            .0
            .push(Node::new(Directive {
                name: self.directive_name.clone(),
                arguments: Vec::new(),
            }));
        self.marked.push(coordinate);
        true
    }

    /// Mark members of a list, returning the new list if any member changed
    fn mark_members<T: Directed>(
        &mut self,
        members: &[Node<T>],
        coordinate: impl Fn(&T) -> SchemaCoordinate,
    ) -> Option<Vec<Node<T>>> {
        let mut members = members.to_vec();
        let mut changed = false;
        for member in &mut members {
            let member_coordinate = coordinate(member);
            changed |= self.mark(member, member_coordinate);
        }
        changed.then_some(members)
    }

    fn mark_fields(
        &mut self,
        type_name: &Name,
        fields: &[Node<FieldDefinition>],
    ) -> Option<Vec<Node<FieldDefinition>>> {
        let mut fields = fields.to_vec();
        let mut changed = false;
        for field in &mut fields {
            let field_name = field.name.clone();
            changed |= self.mark(field, SchemaCoordinate::of_field(type_name, &field_name));
            if let Some(arguments) = self.mark_members(&field.arguments, |argument| {
                SchemaCoordinate::of_argument(type_name, &field_name, &argument.name)
            }) {
                field.make_mut().arguments = arguments;
                changed = true;
            }
        }
        changed.then_some(fields)
    }
}
