//! Runtime utilities
//!
//! This module is only used by the binaries and provides helper code related to runtime
//! configuration.

mod config;
mod logging;

pub use config::{Config, ContractConfig};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
pub use logging::{LogRotationKind, Logging};
use std::path::Path;

/// Prefix of the environment variables read into the config
const ENV_PREFIX: &str = "SCHEMA_CONTRACTS_";

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Read configuration from environment variables only (when no config file is provided)
#[allow(clippy::result_large_err)]
pub fn read_config_from_env() -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .extract()
}

/// Read in a config from a YAML file, filling in any missing values from the environment
#[allow(clippy::result_large_err)]
pub fn read_config(yaml_path: impl AsRef<Path>) -> Result<Config, figment::Error> {
    Figment::new()
        .join(Env::prefixed(ENV_PREFIX).split(ENV_NESTED_SEPARATOR))
        .join(Yaml::file(yaml_path))
        .extract()
}

#[cfg(test)]
mod test {
    use super::*;
    use tracing::Level;

    #[test]
    fn it_prioritizes_env_vars() {
        let config = r#"
            marker_directive: hidden
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("SCHEMA_CONTRACTS_MARKER_DIRECTIVE", "internalOnly");

            let config = read_config(path)?;
            assert_eq!(config.marker_directive, "internalOnly");
            assert_eq!(config.tag_directive, "tag");
            Ok(())
        });
    }

    #[test]
    fn it_extracts_nested_env() {
        let config = r#"
            logging:
                level: info
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("SCHEMA_CONTRACTS_LOGGING__LEVEL", "trace");
            jail.set_env("SCHEMA_CONTRACTS_LOGGING__ROTATION", "hourly");

            let config = read_config(path)?;
            assert_eq!(config.logging.level, Level::TRACE);
            assert_eq!(config.logging.rotation, LogRotationKind::Hourly);
            Ok(())
        });
    }

    #[test]
    fn it_reads_contracts_from_the_file() {
        let config = r#"
            target_id: products@current
            protected_types: [Upload]
            contracts:
              - id: public-api
                include_tags: [public]
              - id: partner-api
                exclude_tags: [internal]
                remove_unreachable_types: false
        "#;

        figment::Jail::expect_with(move |jail| {
            let path = "config.yaml";

            jail.create_file(path, config)?;
            jail.set_env("SCHEMA_CONTRACTS_TARGET_ID", "products@staging");

            let config = read_config(path)?;
            assert_eq!(config.target_id.as_deref(), Some("products@staging"));
            assert_eq!(config.protected_types, vec!["Upload"]);
            assert_eq!(config.contracts.len(), 2);
            assert!(config.contracts[0].remove_unreachable_types);
            assert!(config.contracts[0].exclude_tags.is_empty());
            assert!(!config.contracts[1].remove_unreachable_types);
            Ok(())
        });
    }

    #[test]
    fn it_reads_defaults_from_an_empty_env() {
        figment::Jail::expect_with(|_jail| {
            let config = read_config_from_env()?;
            assert_eq!(config.marker_directive, "inaccessible");
            assert_eq!(config.logging.level, Level::WARN);
            assert!(config.contracts.is_empty());
            Ok(())
        });
    }
}
