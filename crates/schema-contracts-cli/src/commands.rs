//! The work behind each subcommand, separated from file and terminal handling

use anyhow::Context;
use apollo_compiler::Schema;
use apollo_compiler::ast::Document;
use itertools::Itertools;
use schema_contracts::rewrite::parse_directive_name;
use schema_contracts::{
    CompiledContract, ContractCompiler, ContractError, ContractRequest, OwnershipMap, TagIndex,
    reachable_types,
};
use tracing::{debug, info};

use crate::runtime::{Config, ContractConfig};

/// Identifier of a contract given only as tags on the command line
pub const DEFAULT_CONTRACT_ID: &str = "contract";

/// The ownership map of a supergraph, as pretty printed JSON
pub fn ownership(sdl: &str, path: &str) -> anyhow::Result<String> {
    let schema = Schema::parse(sdl, path).map_err(ContractError::from)?;
    let ownership = OwnershipMap::from_supergraph(&schema)?;
    Ok(serde_json::to_string_pretty(&ownership)?)
}

/// The types reachable from the root operation types, one per line
pub fn reachable(sdl: &str, path: &str) -> anyhow::Result<String> {
    let schema = Schema::parse(sdl, path).map_err(ContractError::from)?;
    Ok(reachable_types(&schema)?.iter().join("\n"))
}

/// The tags applied to each schema coordinate, as pretty printed JSON
pub fn tags(sdl: &str, path: &str, config: &Config) -> anyhow::Result<String> {
    let schema = Schema::parse(sdl, path).map_err(ContractError::from)?;
    let tags = TagIndex::from_schema(&schema, &config.tag_directive);
    Ok(serde_json::to_string_pretty(&tags)?)
}

/// A contract requested on the command line
#[derive(Debug, Default)]
pub struct ContractOverride {
    pub id: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub keep_unreachable_types: bool,
}

/// The contracts to compile: the one given on the command line, or else every configured one
///
/// A contract id given on the command line without tags selects a configured contract.
pub fn contract_requests(
    config: &Config,
    target_id: &str,
    cli: ContractOverride,
) -> anyhow::Result<Vec<(String, ContractRequest)>> {
    let request = |contract: &ContractConfig| {
        (
            contract.id.clone(),
            ContractRequest {
                target_id: target_id.to_string(),
                user_specified_contract_id: Some(contract.id.clone()),
                include_tags: Some(contract.include_tags.clone()),
                exclude_tags: Some(contract.exclude_tags.clone()),
                remove_unreachable_types_from_public_api_schema: contract.remove_unreachable_types,
            },
        )
    };

    if !cli.include_tags.is_empty() || !cli.exclude_tags.is_empty() {
        let id = cli.id.unwrap_or_else(|| DEFAULT_CONTRACT_ID.to_string());
        return Ok(vec![(
            id.clone(),
            ContractRequest {
                target_id: target_id.to_string(),
                user_specified_contract_id: Some(id),
                include_tags: Some(cli.include_tags),
                exclude_tags: Some(cli.exclude_tags),
                remove_unreachable_types_from_public_api_schema: !cli.keep_unreachable_types,
            },
        )]);
    }

    let requests = match &cli.id {
        Some(id) => config
            .contracts
            .iter()
            .filter(|contract| &contract.id == id)
            .map(request)
            .collect_vec(),
        None => config.contracts.iter().map(request).collect_vec(),
    };
    if requests.is_empty() {
        match cli.id {
            Some(id) => anyhow::bail!("Contract {id} is not configured"),
            None => anyhow::bail!("No contracts to compile: pass tags or configure contracts"),
        }
    }
    Ok(requests
        .into_iter()
        .map(|(id, mut request)| {
            request.remove_unreachable_types_from_public_api_schema &= !cli.keep_unreachable_types;
            (id, request)
        })
        .collect())
}

/// Validate and compile contracts of one document
///
/// Validation failures are returned as [`schema_contracts::CreateContractError`]. Later requests
/// may not reuse the identifier of an earlier one.
pub fn compile(
    sdl: &str,
    path: &str,
    config: &Config,
    requests: Vec<(String, ContractRequest)>,
) -> anyhow::Result<Vec<(String, CompiledContract)>> {
    let document = Document::parse(sdl, path).map_err(ContractError::from)?;
    let schema = document.to_schema().map_err(ContractError::from)?;
    let tags = TagIndex::from_schema(&schema, &config.tag_directive);
    let ownership = match OwnershipMap::from_supergraph(&schema) {
        Ok(ownership) => Some(ownership),
        Err(error) => {
            debug!(%error, "Not reporting owners of excluded coordinates");
            None
        }
    };
    let marker_directive = parse_directive_name(&config.marker_directive)?;

    let mut compiled: Vec<(String, CompiledContract)> = Vec::with_capacity(requests.len());
    for (id, request) in requests {
        let rule = request.validate(compiled.iter().map(|(id, _)| id.as_str()))?;
        let compiler = ContractCompiler::builder()
            .marker_directive(marker_directive.clone())
            .protected_types(config.protected_types.iter().cloned().collect())
            .remove_unreachable_types(request.remove_unreachable_types_from_public_api_schema)
            .build();
        let contract = compiler
            .compile(&document, &rule, &tags, ownership.as_ref())
            .with_context(|| format!("Failed to compile contract {id}"))?;

        info!(
            contract = %id,
            excluded = contract.excluded.len(),
            "Compiled contract"
        );
        for excluded in &contract.excluded {
            debug!(
                contract = %id,
                coordinate = %excluded.coordinate,
                reason = ?excluded.reason,
                owners = %excluded.owners.iter().join(", "),
                "Excluded coordinate"
            );
        }
        compiled.push((id, contract));
    }
    Ok(compiled)
}

/// Contract schemas joined into one SDL stream, each preceded by a `# <id>` comment line
pub fn concatenate(compiled: &[(String, CompiledContract)]) -> String {
    compiled
        .iter()
        .map(|(id, contract)| format!("# {id}\n{}", contract.document))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use schema_contracts::CreateContractError;

    const SUPERGRAPH: &str = include_str!("../../schema-contracts/src/testdata/supergraph.graphql");

    #[fixture]
    fn config() -> Config {
        Config {
            contracts: vec![
                ContractConfig {
                    id: "public-api".to_string(),
                    include_tags: vec!["public".to_string()],
                    exclude_tags: Vec::new(),
                    remove_unreachable_types: true,
                },
                ContractConfig {
                    id: "partner-api".to_string(),
                    include_tags: Vec::new(),
                    exclude_tags: vec!["internal".to_string()],
                    remove_unreachable_types: false,
                },
            ],
            ..Default::default()
        }
    }

    #[rstest]
    fn it_prefers_contracts_from_the_command_line(config: Config) {
        let requests = contract_requests(
            &config,
            "products",
            ContractOverride {
                exclude_tags: vec!["beta".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, DEFAULT_CONTRACT_ID);
        assert_eq!(requests[0].1.exclude_tags, Some(vec!["beta".to_string()]));
    }

    #[rstest]
    fn it_selects_configured_contracts(config: Config) {
        let all = contract_requests(&config, "products", ContractOverride::default()).unwrap();
        let one = contract_requests(
            &config,
            "products",
            ContractOverride {
                id: Some("partner-api".to_string()),
                keep_unreachable_types: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            all.iter().map(|(id, _)| id.as_str()).collect_vec(),
            vec!["public-api", "partner-api"]
        );
        assert_eq!(one.len(), 1);
        assert!(!one[0].1.remove_unreachable_types_from_public_api_schema);
    }

    #[rstest]
    fn it_fails_without_contracts() {
        let error = contract_requests(
            &Config::default(),
            "products",
            ContractOverride {
                id: Some("missing".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();

        assert_eq!(error.to_string(), "Contract missing is not configured");
    }

    #[rstest]
    fn it_compiles_configured_contracts(config: Config) {
        let requests = contract_requests(&config, "products", ContractOverride::default()).unwrap();
        let compiled = compile(SUPERGRAPH, "supergraph.graphql", &config, requests).unwrap();

        assert_eq!(compiled.len(), 2);
        let (_, partner) = &compiled[1];
        assert!(
            partner
                .excluded
                .iter()
                .all(|excluded| excluded.coordinate.as_str() != "ReviewInput")
        );
        assert!(
            partner
                .document
                .to_string()
                .contains("price: Float @join__field(graph: PRODUCTS) @tag(name: \"internal\") @inaccessible")
        );
    }

    #[rstest]
    fn it_reports_validation_errors(config: Config) {
        let requests = vec![
            contract_requests(&config, "products", ContractOverride::default())
                .unwrap()
                .remove(0);
            2
        ];

        let error = compile(SUPERGRAPH, "supergraph.graphql", &config, requests).unwrap_err();
        let error = error.downcast_ref::<CreateContractError>().unwrap();
        insta::assert_json_snapshot!(error, @r###"
        {
          "message": "Contract identifier public-api is already used by this target",
          "details": {
            "userSpecifiedContractId": "Contract identifier public-api is already used by this target"
          }
        }
        "###);
    }

    #[rstest]
    fn it_separates_contracts_on_stdout(config: Config) {
        let requests = contract_requests(&config, "products", ContractOverride::default()).unwrap();
        let compiled = compile(SUPERGRAPH, "supergraph.graphql", &config, requests).unwrap();

        let output = concatenate(&compiled);

        assert!(output.starts_with("# public-api\n"));
        assert!(output.contains("\n\n# partner-api\n"));
        assert_eq!(
            output.lines().filter(|line| line.starts_with("# ")).collect_vec(),
            vec!["# public-api", "# partner-api"]
        );
    }

    #[test]
    fn it_rejects_invalid_marker_directives() {
        let config = Config {
            marker_directive: "not valid".to_string(),
            ..Default::default()
        };

        let error = compile(SUPERGRAPH, "supergraph.graphql", &config, Vec::new()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ContractError>(),
            Some(ContractError::InvalidDirectiveName(_))
        ));
    }

    #[test]
    fn it_lists_reachable_types() {
        insta::assert_snapshot!(
            reachable(SUPERGRAPH, "supergraph.graphql").unwrap(),
            @r###"
        Query
        Mutation
        Product
        Review
        ReviewInput
        ProductDimension
        DeliveryEstimates
        ProductStatus
        "###
        );
    }
}
