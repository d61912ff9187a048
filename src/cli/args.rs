//! Command line argument parsing
//!
//! Subcommands:
//! - `run`: Run the decision stages against one advertising profile
//! - `verify`: Check credentials and API access by listing a few campaigns
//! - `show-config`: Show configuration discovery and effective values
//! - `init-config`: Write a default user configuration file

use crate::automation::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum ExecutionMode {
    Run(RunConfig),
    Verify(VerifyConfig),
    ShowConfig {
        config_override: Option<PathBuf>,
        key: Option<String>,
    },
    InitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub config_override: Option<PathBuf>,
    pub profile_id: Option<String>,
    pub dry_run: bool,
    /// Empty means the configured `automation.features`
    pub features: Vec<Stage>,
    pub continue_on_error: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    pub config_override: Option<PathBuf>,
    pub profile_id: Option<String>,
    pub sample_size: usize,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "ppc-optimizer")]
#[command(author = "PPC Optimizer Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Performance-driven bid and campaign automation for sponsored products")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the decision stages
    Run {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Advertising profile id (overrides configuration and environment)
        #[arg(short = 'p', long = "profile-id")]
        profile_id: Option<String>,
        /// Compute and audit every decision without changing anything
        #[arg(short = 'n', long = "dry-run")]
        dry_run: bool,
        /// Stages to run (defaults to automation.features)
        #[arg(short = 'f', long = "features", value_enum, num_args = 1..)]
        features: Vec<Stage>,
        /// Keep running later stages after one fails
        #[arg(long = "continue-on-error")]
        continue_on_error: bool,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Verify credentials and API access
    Verify {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Advertising profile id (overrides configuration and environment)
        #[arg(short = 'p', long = "profile-id")]
        profile_id: Option<String>,
        /// Number of campaigns to sample
        #[arg(long = "sample-size", default_value_t = 5)]
        sample_size: usize,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show configuration discovery information and effective values
    ShowConfig {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Print a single dotted key, e.g. bid_optimization.min_bid
        #[arg(short = 'k', long = "key")]
        key: Option<String>,
    },
    /// Create a default configuration file in the user's home directory
    InitConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Run {
                config,
                profile_id,
                dry_run,
                features,
                continue_on_error,
                verbose,
            }) => Ok(ExecutionMode::Run(RunConfig {
                config_override: config.clone(),
                profile_id: profile_id.clone(),
                dry_run: *dry_run,
                features: features.clone(),
                continue_on_error: *continue_on_error,
                verbose: *verbose,
            })),
            Some(Commands::Verify {
                config,
                profile_id,
                sample_size,
                verbose,
            }) => {
                if *sample_size == 0 {
                    return Err("--sample-size must be at least 1".to_string());
                }
                Ok(ExecutionMode::Verify(VerifyConfig {
                    config_override: config.clone(),
                    profile_id: profile_id.clone(),
                    sample_size: *sample_size,
                    verbose: *verbose,
                }))
            }
            Some(Commands::ShowConfig { config, key }) => Ok(ExecutionMode::ShowConfig {
                config_override: config.clone(),
                key: key.clone(),
            }),
            Some(Commands::InitConfig) => Ok(ExecutionMode::InitConfig),
            None => Err(
                "No command specified. Use 'ppc-optimizer --help' to see available commands."
                    .to_string(),
            ),
        }
    }

    /// Whether the selected command asked for debug logging.
    pub fn verbose(&self) -> bool {
        matches!(
            self.command,
            Some(Commands::Run { verbose: true, .. }) | Some(Commands::Verify { verbose: true, .. })
        )
    }
}
