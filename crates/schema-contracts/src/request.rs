//! Contract creation requests and the records they produce.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::rule::{ContractRule, RequestField, ValidationError, validate_identifier};

/// A request to create a contract variant of a target graph
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequest {
    pub target_id: String,
    #[serde(default)]
    pub user_specified_contract_id: Option<String>,
    #[serde(default)]
    pub include_tags: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_tags: Option<Vec<String>>,
    #[serde(default = "default_remove_unreachable_types")]
    pub remove_unreachable_types_from_public_api_schema: bool,
}

fn default_remove_unreachable_types() -> bool {
    true
}

/// A created contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub target: String,
    pub user_specified_contract_id: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub remove_unreachable_types_from_public_api_schema: bool,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// The tag rule this contract applies
    pub fn rule(&self) -> Result<ContractRule, ValidationError> {
        ContractRule::new(Some(&self.include_tags), Some(&self.exclude_tags))
    }
}

/// Every violation found in a contract request, attributed to the offending fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CreateContractError {
    pub message: String,
    pub details: ContractErrorDetails,
    #[serde(skip)]
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_specified_contract_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_tags: Option<String>,
}

impl From<Vec<ValidationError>> for CreateContractError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let by_field = errors
            .iter()
            .into_group_map_by(|error| error.field())
            .into_iter()
            .map(|(field, errors)| (field, errors.iter().join("; ")))
            .collect::<BTreeMap<_, _>>();
        let detail = |field: RequestField| by_field.get(&field).cloned();

        Self {
            message: match errors.as_slice() {
                [error] => error.to_string(),
                _ => format!("Contract request has {} errors", errors.len()),
            },
            details: ContractErrorDetails {
                target_id: detail(RequestField::TargetId),
                user_specified_contract_id: detail(RequestField::UserSpecifiedContractId),
                include_tags: detail(RequestField::IncludeTags),
                exclude_tags: detail(RequestField::ExcludeTags),
            },
            errors,
        }
    }
}

impl ContractRequest {
    /// Check the request, collecting every violation
    ///
    /// `existing_ids` are the user-specified identifiers already used by contracts of the same
    /// target.
    pub fn validate<'a>(
        &self,
        existing_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<ContractRule, CreateContractError> {
        let mut errors = Vec::new();

        if self.target_id.trim().is_empty() {
            errors.push(ValidationError::MissingTarget);
        }
        if let Some(identifier) = &self.user_specified_contract_id {
            if let Err(error) = validate_identifier(identifier) {
                errors.push(error);
            } else if existing_ids.into_iter().any(|id| id == identifier.as_str()) {
                errors.push(ValidationError::DuplicateIdentifier(identifier.clone()));
            }
        }
        let rule = match ContractRule::new(self.include_tags.as_ref(), self.exclude_tags.as_ref()) {
            Ok(rule) => Some(rule),
            Err(error) => {
                errors.push(error);
                None
            }
        };

        match rule {
            Some(rule) if errors.is_empty() => Ok(rule),
            _ => Err(errors.into()),
        }
    }

    /// Validate the request and create the contract record
    pub fn create<'a>(
        self,
        existing_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<Contract, CreateContractError> {
        let rule = self.validate(existing_ids)?;
        Ok(Contract {
            id: Uuid::new_v4(),
            target: self.target_id,
            user_specified_contract_id: self.user_specified_contract_id,
            include_tags: rule.include_tags().iter().cloned().collect(),
            exclude_tags: rule.exclude_tags().iter().cloned().collect(),
            remove_unreachable_types_from_public_api_schema: self
                .remove_unreachable_types_from_public_api_schema,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> ContractRequest {
        serde_json::from_value(serde_json::json!({
            "targetId": "products@current",
            "userSpecifiedContractId": "public-api",
            "includeTags": ["public"],
        }))
        .unwrap()
    }

    #[rstest]
    fn it_defaults_to_removing_unreachable_types(request: ContractRequest) {
        assert!(request.remove_unreachable_types_from_public_api_schema);
        assert_eq!(request.exclude_tags, None);
    }

    #[rstest]
    fn it_creates_include_only_contracts(request: ContractRequest) {
        let contract = request.create(["internal-api"]).unwrap();

        assert_eq!(contract.target, "products@current");
        assert_eq!(contract.include_tags, vec!["public"]);
        assert!(contract.exclude_tags.is_empty());
        assert_eq!(
            contract.rule().unwrap().include_tags().len(),
            1
        );
    }

    #[rstest]
    fn it_rejects_duplicate_identifiers(request: ContractRequest) {
        let error = request.validate(["public-api"]).unwrap_err();

        assert_eq!(
            error.errors,
            vec![ValidationError::DuplicateIdentifier("public-api".to_string())]
        );
        assert!(error.details.user_specified_contract_id.is_some());
    }

    #[rstest]
    #[case("a")]
    #[case(&"a".repeat(65))]
    fn it_rejects_identifiers_out_of_bounds(mut request: ContractRequest, #[case] identifier: &str) {
        request.user_specified_contract_id = Some(identifier.to_string());

        let error = request.validate([]).unwrap_err();
        assert_eq!(
            error.errors,
            vec![ValidationError::InvalidIdentifier(identifier.len())]
        );
    }

    #[rstest]
    fn it_collects_every_violation(mut request: ContractRequest) {
        request.target_id = String::new();
        request.user_specified_contract_id = Some("x".to_string());
        request.exclude_tags = Some(vec!["public".to_string()]);

        let error = request.validate([]).unwrap_err();
        insta::assert_json_snapshot!(error, @r###"
        {
          "message": "Contract request has 3 errors",
          "details": {
            "targetId": "A target id is required",
            "userSpecifiedContractId": "Contract identifier must be between 2 and 64 characters, found 1",
            "excludeTags": "Include and exclude tags must not intersect, found public"
          }
        }
        "###);
    }

    #[rstest]
    fn it_reports_a_single_violation_as_the_message(mut request: ContractRequest) {
        request.include_tags = Some(Vec::new());

        let error = request.validate([]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "At least one include or exclude tag is required"
        );
        assert_eq!(
            error.details,
            ContractErrorDetails {
                include_tags: Some(error.message.clone()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn it_serializes_contracts_in_camel_case() {
        let contract = ContractRequest {
            target_id: "products@current".to_string(),
            user_specified_contract_id: None,
            include_tags: None,
            exclude_tags: Some(vec!["internal".to_string()]),
            remove_unreachable_types_from_public_api_schema: false,
        }
        .create([])
        .unwrap();

        let json = serde_json::to_value(&contract).unwrap();
        assert_eq!(json["excludeTags"], serde_json::json!(["internal"]));
        assert_eq!(json["removeUnreachableTypesFromPublicApiSchema"], false);
        assert!(json["createdAt"].is_string());
        assert_eq!(json["id"].as_str().map(str::len), Some(36));
    }
}
