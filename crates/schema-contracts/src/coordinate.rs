//! Schema coordinates: canonical string keys addressing elements of a GraphQL schema.
//!
//! A coordinate is one of `Type`, `Type.field`, `Type.field.argument` or `Enum.VALUE`. Coordinates
//! are derived from names only, so semantically identical SDL always yields identical keys.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Display;

const SEPARATOR: char = '.';

/// A canonical, totally ordered key for a schema element
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaCoordinate(String);

impl SchemaCoordinate {
    /// The coordinate of a named type
    pub fn of_type(type_name: &str) -> Self {
        Self(type_name.to_string())
    }

    /// The coordinate of a field (or input field) of a type
    pub fn of_field(type_name: &str, field_name: &str) -> Self {
        Self(format!("{type_name}{SEPARATOR}{field_name}"))
    }

    /// The coordinate of an argument of a field
    pub fn of_argument(type_name: &str, field_name: &str, argument_name: &str) -> Self {
        Self(format!(
            "{type_name}{SEPARATOR}{field_name}{SEPARATOR}{argument_name}"
        ))
    }

    /// The coordinate of a value of an enum type
    pub fn of_enum_value(enum_name: &str, value_name: &str) -> Self {
        Self::of_field(enum_name, value_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name of the type this coordinate belongs to
    pub fn type_name(&self) -> &str {
        self.0.split(SEPARATOR).next().unwrap_or_default()
    }

    /// The field or enum value name, if this coordinate addresses a member of a type
    pub fn member_name(&self) -> Option<&str> {
        self.0.split(SEPARATOR).nth(1)
    }

    /// Whether this coordinate addresses a type rather than one of its members
    pub fn is_type(&self) -> bool {
        !self.0.contains(SEPARATOR)
    }

    /// The enclosing coordinate, or `None` for type coordinates
    pub fn parent(&self) -> Option<SchemaCoordinate> {
        self.0
            .rsplit_once(SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }
}

impl Display for SchemaCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaCoordinate {
    fn from(coordinate: &str) -> Self {
        Self(coordinate.to_string())
    }
}

impl Borrow<str> for SchemaCoordinate {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SchemaCoordinate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    #[rstest]
    #[case(SchemaCoordinate::of_type("Query"), "Query")]
    #[case(SchemaCoordinate::of_field("Query", "products"), "Query.products")]
    #[case(
        SchemaCoordinate::of_argument("Query", "product", "id"),
        "Query.product.id"
    )]
    #[case(SchemaCoordinate::of_enum_value("Color", "RED"), "Color.RED")]
    fn it_formats_canonical_strings(#[case] coordinate: SchemaCoordinate, #[case] expected: &str) {
        assert_eq!(coordinate.as_str(), expected);
        assert_eq!(coordinate.to_string(), expected);
    }

    #[test]
    fn it_splits_into_segments() {
        let argument = SchemaCoordinate::of_argument("Query", "product", "id");

        assert_eq!(argument.type_name(), "Query");
        assert_eq!(argument.member_name(), Some("product"));
        assert!(!argument.is_type());
        assert_eq!(
            argument.parent(),
            Some(SchemaCoordinate::of_field("Query", "product"))
        );
        assert_eq!(
            argument.parent().and_then(|field| field.parent()),
            Some(SchemaCoordinate::of_type("Query"))
        );
        assert_eq!(SchemaCoordinate::of_type("Query").parent(), None);
    }

    #[test]
    fn it_orders_types_before_their_members() {
        let coordinates = BTreeSet::from([
            SchemaCoordinate::of_field("Product", "upc"),
            SchemaCoordinate::of_type("Query"),
            SchemaCoordinate::of_type("Product"),
            SchemaCoordinate::of_argument("Product", "price", "currency"),
        ]);

        insta::assert_debug_snapshot!(coordinates, @r###"
        {
            SchemaCoordinate(
                "Product",
            ),
            SchemaCoordinate(
                "Product.price.currency",
            ),
            SchemaCoordinate(
                "Product.upc",
            ),
            SchemaCoordinate(
                "Query",
            ),
        }
        "###);
    }

    #[test]
    fn it_serializes_as_a_plain_string() {
        let coordinate = SchemaCoordinate::of_field("Review", "body");
        assert_eq!(
            serde_json::to_string(&coordinate).unwrap(),
            r#""Review.body""#
        );
    }
}
