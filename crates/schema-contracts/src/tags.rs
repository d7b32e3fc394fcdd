//! Tags attached to schema coordinates.
//!
//! Tags come from applications of a tag directive (conventionally `@tag(name: String!)`) on types,
//! fields, arguments, enum values and input fields. Repeated applications accumulate, and type
//! extensions contribute to the type they extend.

use apollo_compiler::Schema;
use apollo_compiler::ast::{Directive, DirectiveList};
use apollo_compiler::schema::ExtendedType;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::coordinate::SchemaCoordinate;

pub const DEFAULT_TAG_DIRECTIVE: &str = "tag";

/// Lookup from schema coordinates to the tag names applied to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagIndex(BTreeMap<SchemaCoordinate, BTreeSet<String>>);

impl TagIndex {
    /// Collect every application of `tag_directive` in a schema
    pub fn from_schema(schema: &Schema, tag_directive: &str) -> Self {
        let mut index = Self::default();
        let member_tags = |directives: &DirectiveList| -> Vec<String> {
            tag_names(directives.get_all(tag_directive).map(|d| &**d))
        };

        for (type_name, extended_type) in schema
            .types
            .iter()
            .filter(|(_name, extended_type)| !extended_type.is_built_in())
        {
            index.extend_tags(
                SchemaCoordinate::of_type(type_name),
                tag_names(
                    extended_type
                        .directives()
                        .get_all(tag_directive)
                        .map(|component| &*component.node),
                ),
            );

            match extended_type {
                ExtendedType::Object(object) => {
                    for (field_name, field) in &object.fields {
                        index.extend_tags(
                            SchemaCoordinate::of_field(type_name, field_name),
                            member_tags(&field.directives),
                        );
                        for argument in &field.arguments {
                            index.extend_tags(
                                SchemaCoordinate::of_argument(type_name, field_name, &argument.name),
                                member_tags(&argument.directives),
                            );
                        }
                    }
                }
                ExtendedType::Interface(interface) => {
                    for (field_name, field) in &interface.fields {
                        index.extend_tags(
                            SchemaCoordinate::of_field(type_name, field_name),
                            member_tags(&field.directives),
                        );
                        for argument in &field.arguments {
                            index.extend_tags(
                                SchemaCoordinate::of_argument(type_name, field_name, &argument.name),
                                member_tags(&argument.directives),
                            );
                        }
                    }
                }
                ExtendedType::InputObject(input) => {
                    for (field_name, field) in &input.fields {
                        index.extend_tags(
                            SchemaCoordinate::of_field(type_name, field_name),
                            member_tags(&field.directives),
                        );
                    }
                }
                ExtendedType::Enum(enum_type) => {
                    for (value_name, value) in &enum_type.values {
                        index.extend_tags(
                            SchemaCoordinate::of_enum_value(type_name, value_name),
                            member_tags(&value.directives),
                        );
                    }
                }
                ExtendedType::Union(_) | ExtendedType::Scalar(_) => {}
            }
        }
        index
    }

    /// Tag a coordinate
    pub fn insert(&mut self, coordinate: SchemaCoordinate, tag: impl Into<String>) {
        self.0.entry(coordinate).or_default().insert(tag.into());
    }

    /// The tags applied directly to a coordinate
    pub fn tags(&self, coordinate: &SchemaCoordinate) -> Option<&BTreeSet<String>> {
        self.0.get(coordinate)
    }

    /// Every tag name used anywhere in the schema
    pub fn tag_names(&self) -> BTreeSet<&str> {
        self.0
            .values()
            .flat_map(|tags| tags.iter().map(String::as_str))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaCoordinate, &BTreeSet<String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn extend_tags(&mut self, coordinate: SchemaCoordinate, tags: Vec<String>) {
        if !tags.is_empty() {
            self.0.entry(coordinate).or_default().extend(tags);
        }
    }
}

impl<S: Into<String>> FromIterator<(SchemaCoordinate, S)> for TagIndex {
    fn from_iter<T: IntoIterator<Item = (SchemaCoordinate, S)>>(iter: T) -> Self {
        let mut index = Self::default();
        for (coordinate, tag) in iter {
            index.insert(coordinate, tag);
        }
        index
    }
}

fn tag_names<'a>(directives: impl Iterator<Item = &'a Directive>) -> Vec<String> {
    directives
        .filter_map(|directive| directive.specified_argument_by_name("name"))
        .filter_map(|name| name.as_str())
        .map(str::to_string)
        .collect()
}
