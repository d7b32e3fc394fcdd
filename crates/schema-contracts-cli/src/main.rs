use anyhow::Context;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{ArgAction, Parser, Subcommand};
use schema_contracts::CreateContractError;
use std::path::{Path, PathBuf};
use tracing::info;

mod commands;
mod runtime;

use commands::ContractOverride;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the contract compiler
#[derive(Debug, Parser)]
#[command(
    styles = STYLES,
    version,
    about = "Schema Contracts - derive tag-filtered contract schemas from federated GraphQL supergraphs",
)]
struct Args {
    /// Path to a YAML config file
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the subgraphs owning each coordinate of a supergraph as JSON
    Ownership {
        /// The supergraph SDL file
        #[arg(long, short = 's')]
        supergraph: PathBuf,
    },

    /// Print the types reachable from the root operation types
    Reachable {
        /// The schema SDL file
        #[arg(long, short = 's')]
        schema: PathBuf,
    },

    /// Print the tags applied to each schema coordinate as JSON
    Tags {
        /// The schema SDL file
        #[arg(long, short = 's')]
        schema: PathBuf,
    },

    /// Compile contract schemas
    Compile {
        /// The schema SDL file, usually a supergraph
        #[arg(long, short = 's')]
        schema: PathBuf,

        /// The contract to compile; selects a configured contract unless tags are given
        #[arg(long)]
        contract: Option<String>,

        /// Keep only elements tagged with one of these tags
        #[arg(long = "include", action = ArgAction::Append)]
        include_tags: Vec<String>,

        /// Hide elements tagged with any of these tags
        #[arg(long = "exclude", action = ArgAction::Append)]
        exclude_tags: Vec<String>,

        /// Do not hide types that are no longer reachable
        #[arg(long)]
        keep_unreachable_types: bool,

        /// Write each contract to `<contract>.graphql` in this directory instead of stdout
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => runtime::read_config(path)?,
        None => runtime::read_config_from_env()?,
    };
    let _guard = config.logging.setup()?;

    info!("Schema Contracts v{}", std::env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Ownership { supergraph } => {
            let sdl = read_sdl(&supergraph)?;
            println!("{}", commands::ownership(&sdl, &display(&supergraph))?);
        }
        Command::Reachable { schema } => {
            let sdl = read_sdl(&schema)?;
            println!("{}", commands::reachable(&sdl, &display(&schema))?);
        }
        Command::Tags { schema } => {
            let sdl = read_sdl(&schema)?;
            println!("{}", commands::tags(&sdl, &display(&schema), &config)?);
        }
        Command::Compile {
            schema,
            contract,
            include_tags,
            exclude_tags,
            keep_unreachable_types,
            output_dir,
        } => {
            let sdl = read_sdl(&schema)?;
            let target_id = config.target_id.clone().unwrap_or_else(|| {
                schema
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_default()
            });
            let requests = commands::contract_requests(
                &config,
                &target_id,
                ContractOverride {
                    id: contract,
                    include_tags,
                    exclude_tags,
                    keep_unreachable_types,
                },
            )?;

            let compiled = match commands::compile(&sdl, &display(&schema), &config, requests) {
                Ok(compiled) => compiled,
                Err(error) => {
                    if let Some(error) = error.downcast_ref::<CreateContractError>() {
                        println!("{}", serde_json::to_string_pretty(error)?);
                    }
                    return Err(error);
                }
            };

            match &output_dir {
                Some(output_dir) => {
                    std::fs::create_dir_all(output_dir)?;
                    for (id, contract) in compiled {
                        let path = output_dir.join(format!("{id}.graphql"));
                        std::fs::write(&path, contract.document.to_string())
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        info!(contract = %id, path = %path.display(), "Wrote contract schema");
                    }
                }
                None => print!("{}", commands::concatenate(&compiled)),
            }
        }
    }
    Ok(())
}

fn read_sdl(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
