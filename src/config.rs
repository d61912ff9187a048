//! Typed configuration for a run.
//!
//! Every field has a default, so a partial TOML file (or none at all) is valid.
//! [`AutomationConfig::validate`] rejects inconsistent thresholds before any API
//! call is made.

use crate::api::{ApiConfig, ReportsConfig};
use crate::automation::Stage;
use crate::env;
use crate::model::BidLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const WEEKDAYS: [&str; 7] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub api: ApiConfig,
    pub reports: ReportsConfig,
    pub automation: AutomationSettings,
    pub bid_optimization: BidOptimizationConfig,
    pub dayparting: DaypartingConfig,
    pub campaign_management: CampaignManagementConfig,
    pub keyword_discovery: KeywordDiscoveryConfig,
    pub negative_keywords: NegativeKeywordConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    /// Stages run when none are given on the command line
    pub features: Vec<Stage>,
    pub dry_run: bool,
    /// Keep running later stages after one fails
    pub continue_on_error: bool,
    /// Fetch every stage's reports once, up front
    pub prefetch_reports: bool,
    pub audit_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            features: Stage::ALL.to_vec(),
            dry_run: false,
            continue_on_error: false,
            prefetch_reports: true,
            audit_dir: PathBuf::from(env::audit::DEFAULT_AUDIT_DIR),
            profile_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidOptimizationConfig {
    /// Number of daily keyword reports summed per keyword, ending yesterday
    pub lookback_days: u32,
    pub min_clicks: u64,
    pub min_spend: f64,
    pub target_acos: f64,
    pub high_acos: f64,
    pub low_acos: f64,
    pub up_pct: f64,
    pub down_pct: f64,
    pub min_bid: f64,
    pub max_bid: f64,
    pub verify_calculations: bool,
    /// Relative bid swing above which verification warns
    pub max_change_pct: f64,
}

impl Default for BidOptimizationConfig {
    fn default() -> Self {
        Self {
            lookback_days: 1,
            min_clicks: 25,
            min_spend: 5.0,
            target_acos: 0.45,
            high_acos: 0.60,
            low_acos: 0.25,
            up_pct: 0.15,
            down_pct: 0.20,
            min_bid: 0.25,
            max_bid: 5.0,
            verify_calculations: true,
            max_change_pct: 0.5,
        }
    }
}

impl BidOptimizationConfig {
    pub fn limits(&self) -> BidLimits {
        BidLimits::new(self.min_bid, self.max_bid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaypartingConfig {
    pub enabled: bool,
    /// IANA timezone name; unknown names fall back to UTC
    pub timezone: String,
    /// Keyed by weekday name, e.g. `MONDAY`
    pub day_multipliers: HashMap<String, f64>,
    /// Keyed by hour of day, `"0"` to `"23"`
    pub hour_multipliers: HashMap<String, f64>,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Forget remembered base bids at the start of every invocation
    pub reset_base_bids_each_run: bool,
}

impl Default for DaypartingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timezone: "US/Pacific".to_string(),
            day_multipliers: HashMap::new(),
            hour_multipliers: HashMap::new(),
            min_multiplier: 0.4,
            max_multiplier: 1.8,
            reset_base_bids_each_run: false,
        }
    }
}

impl DaypartingConfig {
    pub fn day_multiplier(&self, day: &str) -> f64 {
        self.day_multipliers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(day))
            .map(|(_, m)| *m)
            .unwrap_or(1.0)
    }

    pub fn hour_multiplier(&self, hour: u32) -> f64 {
        self.hour_multipliers
            .iter()
            .find(|(key, _)| key.trim().parse::<u32>().ok() == Some(hour))
            .map(|(_, m)| *m)
            .unwrap_or(1.0)
    }

    /// Day multiplier times hour multiplier, clamped to the configured band.
    pub fn multiplier(&self, day: &str, hour: u32) -> f64 {
        let combined = self.day_multiplier(day) * self.hour_multiplier(hour);
        combined.max(self.min_multiplier).min(self.max_multiplier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignManagementConfig {
    pub acos_threshold: f64,
    pub min_spend: f64,
}

impl Default for CampaignManagementConfig {
    fn default() -> Self {
        Self {
            acos_threshold: 0.45,
            min_spend: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordDiscoveryConfig {
    pub min_clicks: u64,
    pub max_acos: f64,
    pub initial_bid: f64,
}

impl Default for KeywordDiscoveryConfig {
    fn default() -> Self {
        Self {
            min_clicks: 5,
            max_acos: 0.40,
            initial_bid: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeKeywordConfig {
    pub min_spend: f64,
    pub max_acos: f64,
}

impl Default for NegativeKeywordConfig {
    fn default() -> Self {
        Self {
            min_spend: 10.0,
            max_acos: 1.0,
        }
    }
}

impl AutomationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Dotted-key lookup over the effective configuration, e.g.
    /// `bid_optimization.min_bid` or `dayparting.hour_multipliers.9`.
    pub fn lookup(&self, key: &str) -> Option<toml::Value> {
        let root = toml::Value::try_from(self).ok()?;
        key.split('.')
            .filter(|part| !part.is_empty())
            .try_fold(root, |value, part| match value {
                toml::Value::Table(mut table) => table.remove(part),
                toml::Value::Array(mut items) => {
                    let index = part.parse::<usize>().ok()?;
                    (index < items.len()).then(|| items.swap_remove(index))
                }
                _ => None,
            })
    }

    /// Check thresholds for consistency. All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let bid = &self.bid_optimization;

        if bid.min_bid <= 0.0 {
            problems.push(format!("bid_optimization.min_bid must be positive, got {}", bid.min_bid));
        }
        if bid.min_bid > bid.max_bid {
            problems.push(format!(
                "bid_optimization.min_bid ({}) exceeds max_bid ({})",
                bid.min_bid, bid.max_bid
            ));
        }
        if bid.low_acos > bid.high_acos {
            problems.push(format!(
                "bid_optimization.low_acos ({}) exceeds high_acos ({})",
                bid.low_acos, bid.high_acos
            ));
        }
        for (name, value) in [("up_pct", bid.up_pct), ("down_pct", bid.down_pct)] {
            if !(0.0..1.0).contains(&value) {
                problems.push(format!("bid_optimization.{} must be in [0, 1), got {}", name, value));
            }
        }
        if bid.lookback_days == 0 {
            problems.push("bid_optimization.lookback_days must be at least 1".to_string());
        }
        if bid.max_change_pct <= 0.0 {
            problems.push("bid_optimization.max_change_pct must be positive".to_string());
        }

        let daypart = &self.dayparting;
        if daypart.min_multiplier <= 0.0 || daypart.min_multiplier > daypart.max_multiplier {
            problems.push(format!(
                "dayparting multiplier band [{}, {}] is invalid",
                daypart.min_multiplier, daypart.max_multiplier
            ));
        }
        for day in daypart.day_multipliers.keys() {
            if !WEEKDAYS.iter().any(|d| d.eq_ignore_ascii_case(day)) {
                problems.push(format!("dayparting.day_multipliers has unknown day '{}'", day));
            }
        }
        for hour in daypart.hour_multipliers.keys() {
            if !matches!(hour.trim().parse::<u32>(), Ok(h) if h < 24) {
                problems.push(format!("dayparting.hour_multipliers has invalid hour '{}'", hour));
            }
        }
        if daypart
            .day_multipliers
            .values()
            .chain(daypart.hour_multipliers.values())
            .any(|m| *m < 0.0)
        {
            problems.push("dayparting multipliers must not be negative".to_string());
        }

        if self.keyword_discovery.initial_bid <= 0.0 {
            problems.push("keyword_discovery.initial_bid must be positive".to_string());
        }

        if self.api.max_requests_per_second <= 0.0 || self.api.burst_size == 0 {
            problems.push("api rate limit must allow at least one request".to_string());
        }
        for (name, value) in [
            ("api.endpoint", &self.api.endpoint),
            ("api.token_url", &self.api.token_url),
        ] {
            if let Some(value) = value
                && url::Url::parse(value).is_err()
            {
                problems.push(format!("{} '{}' is not a valid URL", name, value));
            }
        }
        if self.reports.max_workers == 0 {
            problems.push("reports.max_workers must be at least 1".to_string());
        }
        if self.reports.poll.timeout_secs <= 0.0 || self.reports.poll.backoff_multiplier < 1.0 {
            problems.push("reports.poll needs a positive timeout and a multiplier >= 1".to_string());
        }

        if let Some(profile_id) = &self.automation.profile_id
            && !is_valid_profile_id(profile_id)
        {
            problems.push(format!("automation.profile_id '{}' is not numeric", profile_id));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }
}

pub fn is_valid_profile_id(profile_id: &str) -> bool {
    !profile_id.is_empty() && profile_id.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AutomationConfig::default();
        assert_eq!(config.bid_optimization.min_clicks, 25);
        assert_eq!(config.bid_optimization.lookback_days, 1);
        assert_eq!(config.dayparting.timezone, "US/Pacific");
        assert!(!config.dayparting.enabled);
        assert_eq!(config.campaign_management.min_spend, 20.0);
        assert_eq!(config.api.max_retries, 3);
        assert_eq!(config.reports.max_workers, 3);
        assert_eq!(config.automation.features.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = AutomationConfig::from_toml_str(
            r#"
            [bid_optimization]
            min_bid = 0.30

            [dayparting]
            enabled = true
            timezone = "America/New_York"

            [dayparting.hour_multipliers]
            "9" = 1.2
            "02" = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.bid_optimization.min_bid, 0.30);
        assert_eq!(config.bid_optimization.max_bid, 5.0);
        assert!(config.dayparting.enabled);
        assert_eq!(config.dayparting.hour_multiplier(9), 1.2);
        assert_eq!(config.dayparting.hour_multiplier(2), 0.5);
        assert_eq!(config.dayparting.hour_multiplier(3), 1.0);
    }

    #[test]
    fn test_multiplier_is_clamped() {
        let mut dayparting = DaypartingConfig::default();
        dayparting.day_multipliers.insert("SATURDAY".to_string(), 1.5);
        dayparting.hour_multipliers.insert("20".to_string(), 1.5);
        dayparting.hour_multipliers.insert("3".to_string(), 0.1);

        assert_eq!(dayparting.multiplier("saturday", 20), 1.8);
        assert_eq!(dayparting.multiplier("MONDAY", 3), 0.4);
        assert_eq!(dayparting.multiplier("MONDAY", 12), 1.0);
        assert_eq!(dayparting.multiplier("SATURDAY", 12), 1.5);
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let mut config = AutomationConfig::default();
        config.bid_optimization.min_bid = 6.0;
        config.bid_optimization.down_pct = 1.2;
        config.dayparting.hour_multipliers.insert("25".to_string(), 1.0);
        config.automation.profile_id = Some("abc".to_string());
        config.api.endpoint = Some("not a url".to_string());

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("api.endpoint 'not a url'"));
        assert!(message.contains("min_bid (6) exceeds max_bid (5)"));
        assert!(message.contains("down_pct"));
        assert!(message.contains("invalid hour '25'"));
        assert!(message.contains("not numeric"));
    }

    #[test]
    fn test_lookup_dotted_keys() {
        let config = AutomationConfig::default();
        assert_eq!(
            config.lookup("bid_optimization.min_bid"),
            Some(toml::Value::Float(0.25))
        );
        assert_eq!(
            config.lookup("api.region"),
            Some(toml::Value::String("NA".to_string()))
        );
        assert_eq!(
            config.lookup("automation.features.0"),
            Some(toml::Value::String("bid_optimization".to_string()))
        );
        assert_eq!(config.lookup("bid_optimization.nope"), None);
        assert_eq!(config.lookup("campaign_management.min_spend.deeper"), None);
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = AutomationConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(AutomationConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let result = AutomationConfig::from_toml_str(
            r#"
            [automation]
            features = ["bid_optimization", "budget_pacing"]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
