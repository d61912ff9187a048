//! Integration tests for CLI functionality
//!
//! These tests verify that argument parsing and configuration discovery work together
//! the way `main` uses them. Unit tests for individual functions are located in the
//! respective module files.

use clap::Parser;
use ppc_optimizer::Stage;
use ppc_optimizer::cli::{Args, ConfigDiscovery, ExecutionMode};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_run_arguments_resolve_against_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ads.toml");
    fs::write(
        &config_path,
        "[automation]\nprofile_id = \"555000\"\nfeatures = [\"dayparting\"]\n",
    )
    .unwrap();

    let args = Args::try_parse_from([
        "ppc-optimizer",
        "run",
        "--config",
        config_path.to_str().unwrap(),
        "--dry-run",
    ])
    .unwrap();
    let ExecutionMode::Run(run) = args.mode().unwrap() else {
        panic!("Expected Run mode");
    };

    let loaded = ConfigDiscovery::load(run.config_override.as_deref()).unwrap();
    assert_eq!(loaded.source.as_deref(), Some(config_path.as_path()));
    assert_eq!(loaded.config.automation.features, vec![Stage::Dayparting]);

    // No --profile-id: the configured one wins over the environment value
    let profile_id = ConfigDiscovery::resolve_profile_id(
        run.profile_id.as_deref(),
        &loaded.config,
        Some("999".to_string()),
    )
    .unwrap();
    assert_eq!(profile_id, "555000");
}

#[test]
fn test_profile_id_flag_overrides_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ads.toml");
    fs::write(&config_path, "[automation]\nprofile_id = \"555000\"\n").unwrap();

    let args = Args::try_parse_from([
        "ppc-optimizer",
        "verify",
        "-c",
        config_path.to_str().unwrap(),
        "-p",
        "777",
    ])
    .unwrap();
    let ExecutionMode::Verify(verify) = args.mode().unwrap() else {
        panic!("Expected Verify mode");
    };
    assert_eq!(verify.sample_size, 5);

    let loaded = ConfigDiscovery::load(verify.config_override.as_deref()).unwrap();
    let profile_id =
        ConfigDiscovery::resolve_profile_id(verify.profile_id.as_deref(), &loaded.config, None)
            .unwrap();
    assert_eq!(profile_id, "777");
}

#[test]
fn test_invalid_config_file_stops_before_connecting() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ads.toml");
    fs::write(
        &config_path,
        "[bid_optimization]\nlow_acos = 0.9\nhigh_acos = 0.5\n",
    )
    .unwrap();

    let error = ConfigDiscovery::load(Some(&config_path)).unwrap_err();
    assert!(error.to_string().contains("low_acos"));
}

#[test]
fn test_show_config_key_lookup() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("ads.toml");
    fs::write(&config_path, "[negative_keywords]\nmin_spend = 12.5\n").unwrap();

    let args = Args::try_parse_from([
        "ppc-optimizer",
        "show-config",
        "--config",
        config_path.to_str().unwrap(),
        "--key",
        "negative_keywords.min_spend",
    ])
    .unwrap();
    let ExecutionMode::ShowConfig {
        config_override,
        key,
    } = args.mode().unwrap()
    else {
        panic!("Expected ShowConfig mode");
    };

    let loaded = ConfigDiscovery::load(config_override.as_deref()).unwrap();
    let value = loaded.config.lookup(key.as_deref().unwrap()).unwrap();
    assert_eq!(value.to_string(), "12.5");
}

#[test]
fn test_default_config_written_by_init_loads_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = ConfigDiscovery::create_default_config_in(temp_dir.path()).unwrap();

    let loaded = ConfigDiscovery::load(Some(&path)).unwrap();
    assert_eq!(loaded.config.automation.features, Stage::ALL.to_vec());
    assert_eq!(loaded.config.bid_optimization.min_bid, 0.25);
}
