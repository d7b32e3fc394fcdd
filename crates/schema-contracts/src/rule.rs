//! Tag rules deciding which schema elements a contract hides.

use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeSet;

/// Shortest accepted user-specified contract identifier, in characters
pub const MIN_IDENTIFIER_LENGTH: usize = 2;

/// Longest accepted user-specified contract identifier, in characters
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// A violation found while validating a contract request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Include and exclude tags must not intersect, found {}", .0.iter().join(", "))]
    TagsIntersect(BTreeSet<String>),

    #[error("At least one include or exclude tag is required")]
    NoTagsProvided,

    #[error("Contract identifier must be between 2 and 64 characters, found {0}")]
    InvalidIdentifier(usize),

    #[error("Contract identifier {0} is already used by this target")]
    DuplicateIdentifier(String),

    #[error("A target id is required")]
    MissingTarget,
}

/// The request field a validation error is reported against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestField {
    TargetId,
    UserSpecifiedContractId,
    IncludeTags,
    ExcludeTags,
}

impl ValidationError {
    pub fn field(&self) -> RequestField {
        match self {
            ValidationError::TagsIntersect(_) => RequestField::ExcludeTags,
            ValidationError::NoTagsProvided => RequestField::IncludeTags,
            ValidationError::InvalidIdentifier(_) | ValidationError::DuplicateIdentifier(_) => {
                RequestField::UserSpecifiedContractId
            }
            ValidationError::MissingTarget => RequestField::TargetId,
        }
    }
}

/// Validated include and exclude tag sets
///
/// At least one set is non-empty and the two never intersect. An empty include set means every
/// tag is allowed; an empty exclude set means nothing is hidden by tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRule {
    include_tags: BTreeSet<String>,
    exclude_tags: BTreeSet<String>,
}

impl ContractRule {
    /// Build a rule, treating missing and empty tag lists alike
    pub fn new<I, E>(
        include_tags: Option<I>,
        exclude_tags: Option<E>,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let include_tags = normalize(include_tags);
        let exclude_tags = normalize(exclude_tags);

        if include_tags.is_empty() && exclude_tags.is_empty() {
            return Err(ValidationError::NoTagsProvided);
        }
        let intersection: BTreeSet<String> =
            include_tags.intersection(&exclude_tags).cloned().collect();
        if !intersection.is_empty() {
            return Err(ValidationError::TagsIntersect(intersection));
        }

        Ok(Self {
            include_tags,
            exclude_tags,
        })
    }

    pub fn include_tags(&self) -> &BTreeSet<String> {
        &self.include_tags
    }

    pub fn exclude_tags(&self) -> &BTreeSet<String> {
        &self.exclude_tags
    }

    /// Whether an element with the given tags is hidden because it matches no include tag
    pub fn filters_out(&self, tags: &BTreeSet<&str>) -> bool {
        !self.include_tags.is_empty()
            && !tags.iter().any(|tag| self.include_tags.contains(*tag))
    }

    /// Whether an element with the given tags is hidden because it matches an exclude tag
    pub fn rejects(&self, tags: &BTreeSet<&str>) -> bool {
        tags.iter().any(|tag| self.exclude_tags.contains(*tag))
    }

    /// Whether an element with the given tags is hidden by this rule
    pub fn excludes(&self, tags: &BTreeSet<&str>) -> bool {
        self.filters_out(tags) || self.rejects(tags)
    }
}

fn normalize<T>(tags: Option<T>) -> BTreeSet<String>
where
    T: IntoIterator,
    T::Item: Into<String>,
{
    tags.into_iter()
        .flatten()
        .map(Into::<String>::into)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Check the length of a user-specified contract identifier
pub fn validate_identifier(identifier: &str) -> Result<(), ValidationError> {
    let length = identifier.chars().count();
    if (MIN_IDENTIFIER_LENGTH..=MAX_IDENTIFIER_LENGTH).contains(&length) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier(length))
    }
}
