//! Special validator scenario runner
//!
//! Replays YAML scenarios against the in-memory chain and validates genesis
//! files.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use special_validator::scenario::{self, Scenario};
use special_validator::{GenesisState, SpecialValidatorConfig};
use std::path::PathBuf;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "special-validator")]
#[command(about = "Governance-admitted validator set: scenario runner and genesis tools")]
struct Cli {
    /// Log directive for this crate (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Genesis file tools
    Genesis {
        #[command(subcommand)]
        command: GenesisCommand,
    },

    /// Replay a scenario and print the validator-set updates of every block
    Run {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Module config file (YAML)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum GenesisCommand {
    /// Parse and validate a genesis JSON file
    Validate { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = format!("special_validator={}", cli.log_level)
        .parse::<Directive>()
        .context("invalid --log-level")?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(directive))
        .init();

    match cli.command {
        Command::Genesis {
            command: GenesisCommand::Validate { file },
        } => validate_genesis(file),
        Command::Run { scenario, config } => run_scenario(scenario, config),
    }
}

fn validate_genesis(file: PathBuf) -> Result<()> {
    let genesis = GenesisState::load(&file)?;
    genesis.validate()?;
    println!(
        "{}: ok ({} special validators)",
        file.display(),
        genesis.special_validators.len()
    );
    Ok(())
}

fn run_scenario(path: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => SpecialValidatorConfig::load(&path)?,
        None => SpecialValidatorConfig::default(),
    };
    let scenario = Scenario::load(&path)?;
    if scenario.blocks.is_empty() {
        bail!("{}: scenario has no blocks", path.display());
    }

    let report = scenario::run(&scenario, config)?;

    for block in &report.blocks {
        println!("block {}", block.height);
        for update in &block.staking {
            println!("  staking  {}", update);
        }
        for update in &block.special {
            println!("  special  {}", update);
        }
        for (index, error) in &block.rejected {
            println!("  rejected action {}: {}", index, error);
        }
    }

    println!("community pool: {}", report.community_pool);
    println!("{}", report.genesis.to_json_pretty()?);
    Ok(())
}
