use anyhow::{Context, Result, bail};
use clap::Parser;
use ppc_optimizer::cli::{Args, ConfigDiscovery, ExecutionMode, RunConfig, VerifyConfig};
use ppc_optimizer::{AdsApiClient, Credentials, PpcAutomation, env};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_directive = if args.verbose() {
        "ppc_optimizer=debug"
    } else {
        "ppc_optimizer=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match mode {
        ExecutionMode::Run(config) => run_mode(config).await,
        ExecutionMode::Verify(config) => verify_mode(config).await,
        ExecutionMode::ShowConfig {
            config_override,
            key,
        } => show_config(config_override.as_deref(), key.as_deref()),
        ExecutionMode::InitConfig => init_config(),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn connect(
    config_override: Option<&std::path::Path>,
    profile_id: Option<&str>,
) -> Result<(ppc_optimizer::AutomationConfig, AdsApiClient)> {
    let loaded = ConfigDiscovery::load(config_override).context("Failed to load configuration")?;
    let config = loaded.config;

    let credentials = Credentials::from_env().context("Failed to read API credentials")?;
    let profile_id = ConfigDiscovery::resolve_profile_id(
        profile_id,
        &config,
        std::env::var(env::vars::PROFILE_ID).ok(),
    )?;

    info!(
        "Connecting to {:?} advertising API for profile {}",
        config.api.region, profile_id
    );
    let client = AdsApiClient::connect(
        config.api.clone(),
        config.reports.clone(),
        credentials,
        profile_id,
    )
    .await
    .context("Failed to authenticate with the advertising API")?;

    Ok((config, client))
}

async fn run_mode(run: RunConfig) -> Result<bool> {
    let (mut config, client) = connect(run.config_override.as_deref(), run.profile_id.as_deref()).await?;
    config.automation.dry_run |= run.dry_run;
    config.automation.continue_on_error |= run.continue_on_error;

    if config.automation.dry_run {
        info!("Dry run: decisions are audited but no changes are sent");
    }

    let automation = PpcAutomation::new(config, Arc::new(client))?;
    let summary = automation.run(&run.features).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(summary.is_success())
}

async fn verify_mode(verify: VerifyConfig) -> Result<bool> {
    let (_, client) = connect(verify.config_override.as_deref(), verify.profile_id.as_deref()).await?;
    let check = client.verify_connection(verify.sample_size).await;

    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(check.success)
}

fn show_config(config_override: Option<&std::path::Path>, key: Option<&str>) -> Result<bool> {
    let loaded = ConfigDiscovery::load(config_override).context("Failed to load configuration")?;

    match key {
        Some(key) => match loaded.config.lookup(key) {
            Some(value) => {
                println!("{}", value);
                Ok(true)
            }
            None => bail!("Unknown configuration key: {}", key),
        },
        None => {
            if config_override.is_none() {
                ConfigDiscovery::show_discovery_info();
                println!();
            }
            println!("{}", loaded.config.to_toml_string()?);
            Ok(true)
        }
    }
}

fn init_config() -> Result<bool> {
    let path = ConfigDiscovery::create_default_user_config()
        .context("Failed to create default configuration")?;
    println!("Configuration file: {}", path.display());
    Ok(true)
}
