//! Reachability of named types from the root operation types of a schema.
//!
//! The traversal is breadth-first over the name-keyed type map of an [`apollo_compiler::Schema`],
//! guarded by the set of already reached types so that cyclic type graphs terminate. From each
//! reached type it follows:
//!
//! * objects and interfaces: field types, argument types and implemented interfaces
//! * interfaces: additionally every object implementing them (their possible types)
//! * unions: member types
//! * input objects: input field types
//!
//! Specified scalars (`String`, `Int`, `Float`, `Boolean`, `ID`) need no definition and are never
//! part of the result.

use apollo_compiler::ast::{DirectiveList, FieldDefinition, OperationType};
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::{Name, Schema};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use crate::coordinate::SchemaCoordinate;
use crate::error::ContractError;

pub const SPECIFIED_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

const ROOT_OPERATION_TYPES: [OperationType; 3] = [
    OperationType::Query,
    OperationType::Mutation,
    OperationType::Subscription,
];

/// Whether a type name is one of the scalars every GraphQL schema provides
pub fn is_specified_scalar(type_name: &str) -> bool {
    SPECIFIED_SCALARS.contains(&type_name)
}

/// Compute the types reachable from the root operation types of a schema
pub fn reachable_types(schema: &Schema) -> Result<ReachableTypes, ContractError> {
    ReachabilityAnalyzer::new(schema).reachable_types()
}

/// The named types reachable from the root operation types, in traversal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReachableTypes(IndexSet<Name>);

impl ReachableTypes {
    pub fn contains(&self, type_name: &str) -> bool {
        self.0.contains(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Name> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Traverses the type graph of a schema starting at its root operation types
pub struct ReachabilityAnalyzer<'schema> {
    schema: &'schema Schema,
    implementers: HashMap<&'schema Name, Vec<&'schema Name>>,
    marker: Option<Name>,
}

impl<'schema> ReachabilityAnalyzer<'schema> {
    pub fn new(schema: &'schema Schema) -> Self {
        let mut implementers: HashMap<&Name, Vec<&Name>> = HashMap::default();
        for (type_name, extended_type) in &schema.types {
            if let ExtendedType::Object(object) = extended_type {
                for interface in &object.implements_interfaces {
                    implementers
                        .entry(&interface.name)
                        .or_default()
                        .push(type_name);
                }
            }
        }

        Self {
            schema,
            implementers,
            marker: None,
        }
    }

    /// Treat every type, field, argument and input field carrying the given directive as removed
    pub fn skipping_marked(mut self, marker: Name) -> Self {
        self.marker = Some(marker);
        self
    }

    /// The root operation types of the schema that are actually defined
    pub fn root_types(&self) -> Vec<&'schema Name> {
        ROOT_OPERATION_TYPES
            .into_iter()
            .filter_map(|operation_type| self.schema.root_operation(operation_type))
            .collect()
    }

    pub fn reachable_types(&self) -> Result<ReachableTypes, ContractError> {
        if self.schema.root_operation(OperationType::Query).is_none() {
            warn!("schema does not define a query root type");
        }

        let mut walk = Walk {
            analyzer: self,
            reachable: IndexSet::default(),
            queue: VecDeque::new(),
        };
        for root_type in self.root_types() {
            walk.visit(root_type, || SchemaCoordinate::of_type("schema"))?;
        }

        while let Some(extended_type) = walk.queue.pop_front() {
            let type_name = extended_type.name();
            match extended_type {
                ExtendedType::Object(object) => {
                    walk.visit_fields(type_name, object.fields.values().map(|field| &***field))?;
                    for interface in &object.implements_interfaces {
                        walk.visit(&interface.name, || SchemaCoordinate::of_type(type_name))?;
                    }
                }
                ExtendedType::Interface(interface) => {
                    walk.visit_fields(type_name, interface.fields.values().map(|field| &***field))?;
                    for parent in &interface.implements_interfaces {
                        walk.visit(&parent.name, || SchemaCoordinate::of_type(type_name))?;
                    }
                    for implementer in self.implementers.get(type_name).into_iter().flatten() {
                        walk.visit(implementer, || SchemaCoordinate::of_type(type_name))?;
                    }
                }
                ExtendedType::Union(union) => {
                    for member in &union.members {
                        walk.visit(&member.name, || SchemaCoordinate::of_type(type_name))?;
                    }
                }
                ExtendedType::InputObject(input) => {
                    for (field_name, field) in &input.fields {
                        if walk.analyzer.is_marked(&field.directives) {
                            continue;
                        }
                        walk.visit(field.ty.inner_named_type(), || {
                            SchemaCoordinate::of_field(type_name, field_name)
                        })?;
                    }
                }
                ExtendedType::Scalar(_) | ExtendedType::Enum(_) => {}
            }
        }

        debug!(
            reachable = walk.reachable.len(),
            defined = self.schema.types.len(),
            "Computed reachable types"
        );
        Ok(ReachableTypes(walk.reachable))
    }

    fn is_marked(&self, directives: &DirectiveList) -> bool {
        self.marker
            .as_ref()
            .is_some_and(|marker| directives.get(marker).is_some())
    }

    fn is_type_marked(&self, extended_type: &ExtendedType) -> bool {
        self.marker
            .as_ref()
            .is_some_and(|marker| extended_type.directives().get(marker).is_some())
    }
}

/// State of a single traversal
struct Walk<'a, 'schema> {
    analyzer: &'a ReachabilityAnalyzer<'schema>,
    reachable: IndexSet<Name>,
    queue: VecDeque<&'schema ExtendedType>,
}

impl<'schema> Walk<'_, 'schema> {
    fn visit(
        &mut self,
        type_name: &Name,
        referenced_by: impl FnOnce() -> SchemaCoordinate,
    ) -> Result<(), ContractError> {
        if is_specified_scalar(type_name) || self.reachable.contains(type_name) {
            return Ok(());
        }
        let extended_type = self.analyzer.schema.types.get(type_name).ok_or_else(|| {
            ContractError::UnknownTypeReference {
                type_name: type_name.to_string(),
                referenced_by: referenced_by(),
            }
        })?;
        if self.analyzer.is_type_marked(extended_type) {
            return Ok(());
        }
        self.reachable.insert(type_name.clone());
        self.queue.push_back(extended_type);
        Ok(())
    }

    fn visit_fields(
        &mut self,
        type_name: &Name,
        fields: impl Iterator<Item = &'schema FieldDefinition>,
    ) -> Result<(), ContractError> {
        for field in fields {
            if self.analyzer.is_marked(&field.directives) {
                continue;
            }
            self.visit(field.ty.inner_named_type(), || {
                SchemaCoordinate::of_field(type_name, &field.name)
            })?;
            for argument in &field.arguments {
                if self.analyzer.is_marked(&argument.directives) {
                    continue;
                }
                self.visit(argument.ty.inner_named_type(), || {
                    SchemaCoordinate::of_argument(type_name, &field.name, &argument.name)
                })?;
            }
        }
        Ok(())
    }
}
