//! Compiling contract schemas.
//!
//! A contract is the target schema with every element hidden by a [`ContractRule`] marked with the
//! marker directive. Compilation runs in three steps:
//!
//! 1. Mark the fields, arguments, enum values and input fields excluded by their tags, and whole
//!    types whose own tags are excluded or whose members are all excluded.
//! 2. Mark visible fields, arguments and input fields whose type is marked, and visible types left
//!    without a visible member (or unions left without a visible member type). Repeat until
//!    nothing changes.
//! 3. Optionally mark every type no longer reachable from the root operation types, repeating
//!    until nothing changes.

use apollo_compiler::ast::{DirectiveList, Document, InputValueDefinition, OperationType};
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::{Name, Node, Schema, name};
use bon::bon;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

use crate::coordinate::SchemaCoordinate;
use crate::error::ContractError;
use crate::ownership::OwnershipMap;
use crate::reachability::ReachabilityAnalyzer;
use crate::rewrite::DirectiveRewriter;
use crate::rule::ContractRule;
use crate::tags::TagIndex;

/// Removing unreachable types settles after one pass, so a second pass must mark nothing
pub const MAX_CASCADE_PASSES: usize = 2;

/// Type name prefixes of federation scaffolding that is never marked
pub const PROTECTED_PREFIXES: [&str; 2] = ["join__", "link__"];

#[derive(Debug, Clone)]
pub struct ContractCompiler {
    rewriter: DirectiveRewriter,
    protected_types: BTreeSet<String>,
    remove_unreachable_types: bool,
}

/// A compiled contract schema
#[derive(Debug, Clone)]
pub struct CompiledContract {
    pub document: Document,
    pub include_tags: BTreeSet<String>,
    pub exclude_tags: BTreeSet<String>,

    /// Every coordinate marked by the compilation, in the order it was marked
    pub excluded: Vec<ExcludedCoordinate>,
}

/// A coordinate hidden from a contract, with the subgraphs that own it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedCoordinate {
    pub coordinate: SchemaCoordinate,
    pub reason: ExclusionReason,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub owners: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Hidden by the include or exclude tags of the rule
    Tags,
    /// Refers to a type hidden by the rule
    HiddenType,
    /// No longer reachable from a root operation type
    Unreachable,
}

#[bon]
impl ContractCompiler {
    #[builder]
    pub fn new(
        #[builder(default = name!("inaccessible"))] marker_directive: Name,
        #[builder(default)] protected_types: BTreeSet<String>,
        #[builder(default = true)] remove_unreachable_types: bool,
    ) -> Self {
        Self {
            rewriter: DirectiveRewriter::new(marker_directive),
            protected_types,
            remove_unreachable_types,
        }
    }
}

impl ContractCompiler {
    pub fn marker_directive(&self) -> &Name {
        self.rewriter.directive_name()
    }

    /// Compile the contract of a document for a rule
    ///
    /// When an ownership map is supplied, each excluded coordinate lists its owning subgraphs. Owners
    /// of arguments are those of their field.
    pub fn compile(
        &self,
        document: &Document,
        rule: &ContractRule,
        tags: &TagIndex,
        ownership: Option<&OwnershipMap>,
    ) -> Result<CompiledContract, ContractError> {
        let start_time = Instant::now();
        let schema = document.to_schema()?;
        let protected = self.protected_types(&schema);
        debug!(protected = %protected.iter().join(", "), "Resolved protected types");

        let mut excluded = Vec::new();
        let mut record = |marked: Vec<SchemaCoordinate>, reason: ExclusionReason| {
            excluded.extend(marked.into_iter().map(|coordinate| ExcludedCoordinate {
                owners: ownership
                    .and_then(|ownership| owners_of(ownership, &coordinate))
                    .cloned()
                    .unwrap_or_default(),
                coordinate,
                reason,
            }));
        };

        let tagged = self.tagged_exclusions(&schema, rule, tags, &protected);
        let rewritten = self.rewriter.mark_coordinates(document, &tagged);
        debug!(marked = rewritten.marked.len(), "Marked tagged elements");
        record(rewritten.marked, ExclusionReason::Tags);

        let mut document = rewritten.document;
        loop {
            let schema = document.to_schema()?;
            let mut hidden = self.hidden_type_references(&schema, &protected);
            hidden.extend(self.emptied_types(&schema, &protected));
            let rewritten = self.rewriter.mark_coordinates(&document, &hidden);
            debug!(
                marked = rewritten.marked.len(),
                "Marked references to hidden types"
            );
            if rewritten.marked.is_empty() {
                break;
            }
            record(rewritten.marked, ExclusionReason::HiddenType);
            document = rewritten.document;
        }

        if self.remove_unreachable_types {
            document =
                self.remove_unreachable(document, &protected, MAX_CASCADE_PASSES, |marked| {
                    record(marked, ExclusionReason::Unreachable)
                })?;
        }

        info!(
            "Compiled contract with {} excluded coordinates in {:.2?}",
            excluded.len(),
            start_time.elapsed()
        );
        Ok(CompiledContract {
            document,
            include_tags: rule.include_tags().clone(),
            exclude_tags: rule.exclude_tags().clone(),
            excluded,
        })
    }

    /// Types that are never marked: federation scaffolding, types used by directive definitions,
    /// and the configured names
    fn protected_types(&self, schema: &Schema) -> BTreeSet<String> {
        schema
            .types
            .keys()
            .filter(|type_name| {
                PROTECTED_PREFIXES
                    .iter()
                    .any(|prefix| type_name.starts_with(prefix))
            })
            .map(|type_name| type_name.to_string())
            .chain(
                schema
                    .directive_definitions
                    .values()
                    .flat_map(|definition| definition.arguments.iter())
                    .map(|argument| argument.ty.inner_named_type().to_string()),
            )
            .chain(self.protected_types.iter().cloned())
            .collect()
    }

    fn tagged_exclusions(
        &self,
        schema: &Schema,
        rule: &ContractRule,
        tags: &TagIndex,
        protected: &BTreeSet<String>,
    ) -> BTreeSet<SchemaCoordinate> {
        let query_root = schema.root_operation(OperationType::Query);
        let own_tags = |coordinate: &SchemaCoordinate| -> BTreeSet<&str> {
            tags.tags(coordinate)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect()
        };

        let mut excluded = BTreeSet::new();
        for (type_name, extended_type) in schema.types.iter().filter(|(type_name, extended_type)| {
            !extended_type.is_built_in() && !protected.contains(type_name.as_str())
        }) {
            let type_coordinate = SchemaCoordinate::of_type(type_name);
            let type_tags = own_tags(&type_coordinate);
            // Fields and enum values carry the tags of their type
            let member_excluded = |coordinate: &SchemaCoordinate| {
                let mut member_tags = own_tags(coordinate);
                member_tags.extend(type_tags.iter().copied());
                rule.excludes(&member_tags)
            };

            let mut members = Vec::new();
            let mut values = Vec::new();
            match extended_type {
                ExtendedType::Object(object) => {
                    for (field_name, field) in &object.fields {
                        let coordinate = SchemaCoordinate::of_field(type_name, field_name);
                        members.push((member_excluded(&coordinate), coordinate));
                        values.extend(field.arguments.iter().map(|argument| {
                            SchemaCoordinate::of_argument(type_name, field_name, &argument.name)
                        }));
                    }
                }
                ExtendedType::Interface(interface) => {
                    for (field_name, field) in &interface.fields {
                        let coordinate = SchemaCoordinate::of_field(type_name, field_name);
                        members.push((member_excluded(&coordinate), coordinate));
                        values.extend(field.arguments.iter().map(|argument| {
                            SchemaCoordinate::of_argument(type_name, field_name, &argument.name)
                        }));
                    }
                }
                ExtendedType::Enum(enum_type) => {
                    for value_name in enum_type.values.keys() {
                        let coordinate = SchemaCoordinate::of_enum_value(type_name, value_name);
                        members.push((member_excluded(&coordinate), coordinate));
                    }
                }
                ExtendedType::InputObject(input) => {
                    values.extend(
                        input
                            .fields
                            .keys()
                            .map(|field_name| SchemaCoordinate::of_field(type_name, field_name)),
                    );
                }
                ExtendedType::Union(_) | ExtendedType::Scalar(_) => {}
            }

            let hidden_type = query_root != Some(type_name)
                && (rule.rejects(&type_tags)
                    || (!members.is_empty() && members.iter().all(|(excluded, _)| *excluded)));
            if hidden_type {
                excluded.insert(type_coordinate);
                continue;
            }
            excluded.extend(
                members
                    .into_iter()
                    .filter_map(|(excluded, coordinate)| excluded.then_some(coordinate)),
            );
            // Arguments and input fields are only hidden by exclude tags
            excluded.extend(
                values
                    .into_iter()
                    .filter(|coordinate| rule.rejects(&own_tags(coordinate))),
            );
        }
        excluded
    }

    /// Visible fields, arguments and input fields of visible types whose type is marked
    fn hidden_type_references(
        &self,
        schema: &Schema,
        protected: &BTreeSet<String>,
    ) -> BTreeSet<SchemaCoordinate> {
        let marker = self.marker_directive();
        let is_hidden = |type_name: &Name| {
            schema
                .types
                .get(type_name)
                .is_some_and(|extended_type| extended_type.directives().get(marker).is_some())
        };
        let hidden_arguments = |type_name: &Name,
                                field_name: &Name,
                                arguments: &[Node<InputValueDefinition>]|
         -> Vec<SchemaCoordinate> {
            arguments
                .iter()
                .filter(|argument| {
                    argument.directives.get(marker).is_none()
                        && is_hidden(argument.ty.inner_named_type())
                })
                .map(|argument| SchemaCoordinate::of_argument(type_name, field_name, &argument.name))
                .collect()
        };

        let mut references = BTreeSet::new();
        for (type_name, extended_type) in schema.types.iter().filter(|(type_name, extended_type)| {
            !extended_type.is_built_in()
                && !protected.contains(type_name.as_str())
                && extended_type.directives().get(marker).is_none()
        }) {
            match extended_type {
                ExtendedType::Object(object) => {
                    for (field_name, field) in &object.fields {
                        if field.directives.get(marker).is_some() {
                            continue;
                        }
                        if is_hidden(field.ty.inner_named_type()) {
                            references.insert(SchemaCoordinate::of_field(type_name, field_name));
                        } else {
                            references.extend(hidden_arguments(type_name, field_name, &field.arguments));
                        }
                    }
                }
                ExtendedType::Interface(interface) => {
                    for (field_name, field) in &interface.fields {
                        if field.directives.get(marker).is_some() {
                            continue;
                        }
                        if is_hidden(field.ty.inner_named_type()) {
                            references.insert(SchemaCoordinate::of_field(type_name, field_name));
                        } else {
                            references.extend(hidden_arguments(type_name, field_name, &field.arguments));
                        }
                    }
                }
                ExtendedType::InputObject(input) => {
                    references.extend(
                        input
                            .fields
                            .iter()
                            .filter(|(_, field)| {
                                field.directives.get(marker).is_none()
                                    && is_hidden(field.ty.inner_named_type())
                            })
                            .map(|(field_name, _)| SchemaCoordinate::of_field(type_name, field_name)),
                    );
                }
                ExtendedType::Enum(_) | ExtendedType::Union(_) | ExtendedType::Scalar(_) => {}
            }
        }
        references
    }

    /// Visible types whose members are all marked, and visible unions whose member types are all
    /// marked
    ///
    /// The query root is never returned.
    fn emptied_types(
        &self,
        schema: &Schema,
        protected: &BTreeSet<String>,
    ) -> BTreeSet<SchemaCoordinate> {
        let marker = self.marker_directive();
        let query_root = schema.root_operation(OperationType::Query);
        let all_marked = |members: Vec<&DirectiveList>| {
            !members.is_empty()
                && members
                    .iter()
                    .all(|directives| directives.get(marker).is_some())
        };

        schema
            .types
            .iter()
            .filter(|(type_name, extended_type)| {
                !extended_type.is_built_in()
                    && !protected.contains(type_name.as_str())
                    && query_root != Some(*type_name)
                    && extended_type.directives().get(marker).is_none()
            })
            .filter(|(_, extended_type)| match extended_type {
                ExtendedType::Object(object) => {
                    all_marked(object.fields.values().map(|field| &field.directives).collect())
                }
                ExtendedType::Interface(interface) => all_marked(
                    interface
                        .fields
                        .values()
                        .map(|field| &field.directives)
                        .collect(),
                ),
                ExtendedType::Enum(enum_type) => all_marked(
                    enum_type
                        .values
                        .values()
                        .map(|value| &value.directives)
                        .collect(),
                ),
                ExtendedType::InputObject(input) => {
                    all_marked(input.fields.values().map(|field| &field.directives).collect())
                }
                ExtendedType::Union(union) => {
                    !union.members.is_empty()
                        && union.members.iter().all(|member| {
                            schema.types.get(&member.name).is_some_and(|member_type| {
                                member_type.directives().get(marker).is_some()
                            })
                        })
                }
                ExtendedType::Scalar(_) => false,
            })
            .map(|(type_name, _)| SchemaCoordinate::of_type(type_name))
            .collect()
    }

    /// Mark every unprotected type that is not reachable from a root operation type, until a
    /// fixed point
    fn remove_unreachable(
        &self,
        mut document: Document,
        protected: &BTreeSet<String>,
        max_passes: usize,
        mut on_marked: impl FnMut(Vec<SchemaCoordinate>),
    ) -> Result<Document, ContractError> {
        for pass in 1..=max_passes {
            let schema = document.to_schema()?;
            let reachable = ReachabilityAnalyzer::new(&schema)
                .skipping_marked(self.marker_directive().clone())
                .reachable_types()?;
            let rewritten = self.rewriter.mark_types_except(&document, |type_name| {
                reachable.contains(type_name) || protected.contains(type_name)
            });

            debug!(pass, marked = rewritten.marked.len(), "Marked unreachable types");
            if rewritten.marked.is_empty() {
                return Ok(rewritten.document);
            }
            on_marked(rewritten.marked);
            document = rewritten.document;
        }
        Err(ContractError::CascadeDidNotConverge(max_passes))
    }
}

/// The owners of a coordinate, falling back to its enclosing coordinates
fn owners_of<'a>(
    ownership: &'a OwnershipMap,
    coordinate: &SchemaCoordinate,
) -> Option<&'a BTreeSet<String>> {
    std::iter::successors(Some(coordinate.clone()), SchemaCoordinate::parent)
        .find_map(|coordinate| ownership.owners(&coordinate))
}
