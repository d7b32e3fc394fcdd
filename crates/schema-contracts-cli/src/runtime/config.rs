use schemars::JsonSchema;
use serde::Deserialize;

use super::logging::Logging;

/// Configuration for compiling contract schemas
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: Logging,

    /// The directive marking hidden schema elements
    pub marker_directive: String,

    /// The directive carrying tags, with a `name` string argument
    pub tag_directive: String,

    /// Types that are never marked, in addition to the federation scaffolding
    pub protected_types: Vec<String>,

    /// The graph the contracts are derived from
    pub target_id: Option<String>,

    /// The contracts to compile when none is given on the command line
    pub contracts: Vec<ContractConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: Logging::default(),
            marker_directive: schema_contracts::rewrite::DEFAULT_MARKER_DIRECTIVE.to_string(),
            tag_directive: schema_contracts::tags::DEFAULT_TAG_DIRECTIVE.to_string(),
            protected_types: Vec::new(),
            target_id: None,
            contracts: Vec::new(),
        }
    }
}

/// A named contract
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContractConfig {
    /// The contract identifier, between 2 and 64 characters
    pub id: String,

    /// Keep only elements tagged with one of these tags
    #[serde(default)]
    pub include_tags: Vec<String>,

    /// Hide elements tagged with any of these tags
    #[serde(default)]
    pub exclude_tags: Vec<String>,

    /// Hide types that are no longer reachable from the root operation types
    #[serde(default = "remove_unreachable_types")]
    pub remove_unreachable_types: bool,
}

fn remove_unreachable_types() -> bool {
    true
}
