use ppc_optimizer::config::AutomationConfig;
use ppc_optimizer::{ConfigError, Region, Stage};
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"
[api]
region = "EU"
max_requests_per_second = 5.0
burst_size = 2

[reports]
max_workers = 2

[reports.poll]
initial_interval_secs = 1.0
timeout_secs = 120.0

[automation]
features = ["campaign_management", "bid_optimization"]
dry_run = true
continue_on_error = true
audit_dir = "/var/log/ppc"
profile_id = "1234567890"

[bid_optimization]
lookback_days = 7
min_clicks = 20
high_acos = 0.5
low_acos = 0.2

[dayparting]
enabled = true
timezone = "Europe/Berlin"
min_multiplier = 0.5
max_multiplier = 1.5

[dayparting.day_multipliers]
SATURDAY = 0.8
sunday = 0.7

[dayparting.hour_multipliers]
"9" = 1.2
"23" = 0.6

[campaign_management]
acos_threshold = 0.35

[keyword_discovery]
initial_bid = 0.9

[negative_keywords]
min_spend = 15.0
"#;

#[test]
fn test_full_config_parses() {
    let config = AutomationConfig::from_toml_str(FULL_CONFIG).expect("config should parse");
    config.validate().expect("config should be valid");

    assert_eq!(config.api.region, Region::EU);
    assert_eq!(config.api.burst_size, 2);
    assert_eq!(config.reports.max_workers, 2);
    assert_eq!(config.reports.poll.timeout_secs, 120.0);
    assert_eq!(
        config.automation.features,
        vec![Stage::CampaignManagement, Stage::BidOptimization]
    );
    assert!(config.automation.dry_run);
    assert_eq!(config.bid_optimization.lookback_days, 7);
    assert_eq!(config.bid_optimization.max_bid, 5.0);
    assert!((config.dayparting.multiplier("Sunday", 9) - 0.84).abs() < 1e-9);
    assert_eq!(config.dayparting.multiplier("SATURDAY", 23), 0.5);
    assert_eq!(config.campaign_management.acos_threshold, 0.35);
    assert_eq!(config.negative_keywords.max_acos, 1.0);
}

#[test]
fn test_config_file_roundtrip() {
    let original = AutomationConfig::from_toml_str(FULL_CONFIG).unwrap();

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    original
        .to_toml_file(temp_file.path())
        .expect("Should be able to save config to file");
    let loaded = AutomationConfig::from_toml_file(temp_file.path())
        .expect("Should be able to load config from file");

    assert_eq!(original, loaded);
}

#[test]
fn test_lookup_reads_effective_values() {
    let config = AutomationConfig::from_toml_str(FULL_CONFIG).unwrap();
    assert_eq!(
        config.lookup("dayparting.timezone"),
        Some(toml::Value::String("Europe/Berlin".to_string()))
    );
    assert_eq!(
        config.lookup("bid_optimization.min_clicks"),
        Some(toml::Value::Integer(20))
    );
    assert_eq!(
        config.lookup("dayparting.hour_multipliers.9"),
        Some(toml::Value::Float(1.2))
    );
    // Untouched sections still answer with defaults
    assert_eq!(
        config.lookup("keyword_discovery.min_clicks"),
        Some(toml::Value::Integer(5))
    );
    assert_eq!(config.lookup("dayparting.hour_multipliers.12"), None);
}

#[test]
fn test_invalid_values_are_rejected() {
    let parse_error = AutomationConfig::from_toml_str("[api]\nregion = \"MARS\"\n");
    assert!(matches!(parse_error, Err(ConfigError::Parse(_))));

    let config = AutomationConfig::from_toml_str(
        r#"
        [dayparting]
        min_multiplier = 2.0
        max_multiplier = 1.0

        [dayparting.day_multipliers]
        FUNDAY = 1.1
        "#,
    )
    .unwrap();
    let message = config.validate().unwrap_err().to_string();
    assert!(message.contains("multiplier band"));
    assert!(message.contains("unknown day 'FUNDAY'"));
}

#[test]
fn test_missing_file_is_read_error() {
    let result = AutomationConfig::from_toml_file("/nonexistent/ppc-optimizer.toml");
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
