//! Subgraph ownership of supergraph coordinates.
//!
//! A federation supergraph records which subgraph contributes each element through the join spec:
//!
//! * `enum join__Graph` maps internal graph symbols to subgraph names with `@join__graph(name:)`
//! * `@join__type(graph:)` is repeated on a type once per subgraph defining it
//! * `@join__field(graph:)` and `@join__enumValue(graph:)` narrow ownership of single members
//!
//! Members without their own join directive belong to every subgraph owning the parent type.
//! Explicit member directives always take precedence over that default, even when they name a
//! strict subset of the type's owners. Arguments are not tracked: they belong to their field.

use apollo_compiler::ast::{Directive, DirectiveList, Value};
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::{Name, Schema};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::coordinate::SchemaCoordinate;
use crate::error::ContractError;

const JOIN_GRAPH_ENUM: &str = "join__Graph";
const JOIN_GRAPH: &str = "join__graph";
const JOIN_TYPE: &str = "join__type";
const JOIN_FIELD: &str = "join__field";
const JOIN_ENUM_VALUE: &str = "join__enumValue";

/// Mapping from schema coordinates to the names of the subgraphs contributing them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipMap {
    subgraphs: BTreeSet<String>,
    owners: BTreeMap<SchemaCoordinate, BTreeSet<String>>,
}

impl OwnershipMap {
    /// Parse supergraph SDL and extract its ownership map
    pub fn from_supergraph_sdl(sdl: &str) -> Result<Self, ContractError> {
        let schema = Schema::parse(sdl, "supergraph.graphql")?;
        Self::from_supergraph(&schema)
    }

    /// Extract the ownership map of a supergraph schema
    pub fn from_supergraph(schema: &Schema) -> Result<Self, ContractError> {
        let graphs = GraphNames::new(schema)?;
        let mut ownership = Self {
            subgraphs: graphs.names(),
            owners: BTreeMap::new(),
        };

        for (type_name, extended_type) in schema
            .types
            .iter()
            .filter(|(_name, extended_type)| !extended_type.is_built_in())
        {
            let mut type_owners = graphs.owners_of(
                extended_type
                    .directives()
                    .get_all(JOIN_TYPE)
                    .map(|component| &*component.node),
            )?;

            let contributed = match extended_type {
                ExtendedType::Object(object) => ownership.insert_members(
                    &graphs,
                    type_name,
                    &type_owners,
                    JOIN_FIELD,
                    object
                        .fields
                        .iter()
                        .map(|(name, field)| (name, &field.directives)),
                )?,
                ExtendedType::Interface(interface) => ownership.insert_members(
                    &graphs,
                    type_name,
                    &type_owners,
                    JOIN_FIELD,
                    interface
                        .fields
                        .iter()
                        .map(|(name, field)| (name, &field.directives)),
                )?,
                ExtendedType::InputObject(input) => ownership.insert_members(
                    &graphs,
                    type_name,
                    &type_owners,
                    JOIN_FIELD,
                    input
                        .fields
                        .iter()
                        .map(|(name, field)| (name, &field.directives)),
                )?,
                ExtendedType::Enum(enum_type) => ownership.insert_members(
                    &graphs,
                    type_name,
                    &type_owners,
                    JOIN_ENUM_VALUE,
                    enum_type
                        .values
                        .iter()
                        .map(|(name, value)| (name, &value.directives)),
                )?,
                ExtendedType::Union(_) | ExtendedType::Scalar(_) => BTreeSet::new(),
            };

            // A type is contributed by every subgraph contributing one of its members
            type_owners.extend(contributed);
            ownership.insert(SchemaCoordinate::of_type(type_name), type_owners);
        }

        debug!(
            subgraphs = ownership.subgraphs.len(),
            coordinates = ownership.owners.len(),
            "Extracted supergraph ownership"
        );
        Ok(ownership)
    }

    /// The names of all subgraphs declared by the supergraph
    pub fn subgraphs(&self) -> &BTreeSet<String> {
        &self.subgraphs
    }

    /// The subgraphs owning a coordinate
    pub fn owners(&self, coordinate: &SchemaCoordinate) -> Option<&BTreeSet<String>> {
        self.owners.get(coordinate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SchemaCoordinate, &BTreeSet<String>)> {
        self.owners.iter()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Record the owners of every member of a type, returning the union of those owners
    fn insert_members<'a>(
        &mut self,
        graphs: &GraphNames,
        type_name: &str,
        type_owners: &BTreeSet<String>,
        directive_name: &str,
        members: impl Iterator<Item = (&'a Name, &'a DirectiveList)>,
    ) -> Result<BTreeSet<String>, ContractError> {
        let mut contributed = BTreeSet::new();
        for (member_name, directives) in members {
            let explicit = graphs.owners_of(directives.get_all(directive_name).map(|d| &**d))?;
            let owners = if explicit.is_empty() {
                type_owners.clone()
            } else {
                explicit
            };
            contributed.extend(owners.iter().cloned());
            self.insert(SchemaCoordinate::of_field(type_name, member_name), owners);
        }
        Ok(contributed)
    }

    fn insert(&mut self, coordinate: SchemaCoordinate, owners: BTreeSet<String>) {
        if !owners.is_empty() {
            self.owners.entry(coordinate).or_default().extend(owners);
        }
    }
}

/// Lookup from `join__Graph` symbols to subgraph names
struct GraphNames(BTreeMap<String, String>);

impl GraphNames {
    fn new(schema: &Schema) -> Result<Self, ContractError> {
        let graph_enum = schema.get_enum(JOIN_GRAPH_ENUM).ok_or_else(|| {
            ContractError::MalformedSupergraph(format!("missing {JOIN_GRAPH_ENUM} enum"))
        })?;

        Ok(Self(
            graph_enum
                .values
                .iter()
                .filter_map(|(symbol, value)| {
                    let name = value
                        .directives
                        .get(JOIN_GRAPH)
                        .and_then(|directive| directive.specified_argument_by_name("name"))
                        .and_then(|name| name.as_str());
                    if name.is_none() {
                        debug!(%symbol, "{JOIN_GRAPH_ENUM} value has no @{JOIN_GRAPH} name");
                    }
                    name.map(|name| (symbol.to_string(), name.to_string()))
                })
                .collect(),
        ))
    }

    fn names(&self) -> BTreeSet<String> {
        self.0.values().cloned().collect()
    }

    /// Resolve the `graph` argument of every given join directive to a subgraph name
    fn owners_of<'a>(
        &self,
        directives: impl Iterator<Item = &'a Directive>,
    ) -> Result<BTreeSet<String>, ContractError> {
        directives
            .filter_map(|directive| directive.specified_argument_by_name("graph"))
            .map(|graph| self.resolve(graph))
            .collect()
    }

    fn resolve(&self, graph: &Value) -> Result<String, ContractError> {
        match graph {
            Value::Enum(symbol) => self.0.get(symbol.as_str()).cloned().ok_or_else(|| {
                ContractError::MalformedSupergraph(format!(
                    "graph {symbol} is not declared with @{JOIN_GRAPH}"
                ))
            }),
            other => Err(ContractError::MalformedSupergraph(format!(
                "expected a {JOIN_GRAPH_ENUM} value, found {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const SUPERGRAPH: &str = include_str!("testdata/supergraph.graphql");

    #[fixture]
    fn ownership() -> OwnershipMap {
        OwnershipMap::from_supergraph_sdl(SUPERGRAPH).unwrap()
    }

    fn owners_of(ownership: &OwnershipMap, coordinate: &str) -> Vec<String> {
        ownership
            .owners(&SchemaCoordinate::from(coordinate))
            .map(|owners| owners.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[rstest]
    fn it_lists_declared_subgraphs(ownership: OwnershipMap) {
        assert_eq!(
            ownership.subgraphs().iter().collect::<Vec<_>>(),
            vec!["inventory", "products", "reviews"]
        );
    }

    #[rstest]
    fn fields_without_join_field_inherit_type_owners(ownership: OwnershipMap) {
        assert_eq!(
            owners_of(&ownership, "DeliveryEstimates.estimatedDelivery"),
            vec!["inventory"]
        );
        assert_eq!(
            owners_of(&ownership, "Product.id"),
            vec!["inventory", "products", "reviews"]
        );
    }

    #[rstest]
    fn join_field_overrides_type_owners(ownership: OwnershipMap) {
        assert_eq!(owners_of(&ownership, "Product.reviews"), vec!["reviews"]);
        assert_eq!(
            owners_of(&ownership, "Product.dimensions"),
            vec!["inventory", "products"]
        );
    }

    #[rstest]
    fn root_types_list_every_contributing_subgraph(ownership: OwnershipMap) {
        assert_eq!(
            owners_of(&ownership, "Query"),
            vec!["inventory", "products", "reviews"]
        );
        assert_eq!(owners_of(&ownership, "Mutation"), vec!["reviews"]);
    }

    #[rstest]
    #[case("ProductStatus.AVAILABLE", vec!["inventory", "products"])]
    #[case("ProductStatus.DISCONTINUED", vec!["products"])]
    #[case("ReviewInput.body", vec!["reviews"])]
    #[case("ReviewInput.rating", vec!["reviews"])]
    fn it_tracks_enum_values_and_input_fields(
        ownership: OwnershipMap,
        #[case] coordinate: &str,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(owners_of(&ownership, coordinate), expected);
    }

    #[rstest]
    #[case("join__Graph")]
    #[case("join__FieldSet")]
    #[case("link__Purpose")]
    #[case("Product.delivery.zip")]
    #[case("String")]
    fn it_skips_unowned_coordinates(ownership: OwnershipMap, #[case] coordinate: &str) {
        assert!(owners_of(&ownership, coordinate).is_empty());
    }

    #[test]
    fn it_requires_the_graph_enum() {
        let error = OwnershipMap::from_supergraph_sdl(
            r#"
            directive @join__type(graph: String!) repeatable on OBJECT
            type Query @join__type(graph: "a") { id: ID }
            "#,
        )
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Malformed supergraph: missing join__Graph enum"
        );
    }

    #[test]
    fn it_rejects_undeclared_graph_symbols() {
        let error = OwnershipMap::from_supergraph_sdl(
            r#"
            directive @join__graph(name: String!, url: String!) on ENUM_VALUE
            directive @join__type(graph: join__Graph!) repeatable on OBJECT
            enum join__Graph {
              A @join__graph(name: "a", url: "http://a")
              B
            }
            type Query @join__type(graph: A) @join__type(graph: B) { id: ID }
            "#,
        )
        .unwrap_err();

        assert!(matches!(error, ContractError::MalformedSupergraph(_)));
        assert_eq!(
            error.to_string(),
            "Malformed supergraph: graph B is not declared with @join__graph"
        );
    }

    #[test]
    fn it_serializes_to_json() {
        let ownership = OwnershipMap::from_supergraph_sdl(
            r#"
            directive @join__graph(name: String!, url: String!) on ENUM_VALUE
            directive @join__type(graph: join__Graph!) repeatable on OBJECT
            directive @join__field(graph: join__Graph) repeatable on FIELD_DEFINITION
            enum join__Graph {
              A @join__graph(name: "accounts", url: "http://a")
              B @join__graph(name: "billing", url: "http://b")
            }
            type Query @join__type(graph: A) @join__type(graph: B) {
              me: String @join__field(graph: A)
              invoices: [String] @join__field(graph: B)
            }
            "#,
        )
        .unwrap();

        insta::assert_json_snapshot!(ownership, @r###"
        {
          "subgraphs": [
            "accounts",
            "billing"
          ],
          "owners": {
            "Query": [
              "accounts",
              "billing"
            ],
            "Query.invoices": [
              "billing"
            ],
            "Query.me": [
              "accounts"
            ]
          }
        }
        "###);
    }
}
