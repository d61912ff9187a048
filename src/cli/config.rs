//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit `--config` path
//! 2. Current directory: ./ppc-optimizer.toml or ./.ppc/config.toml
//! 3. User config: ~/.ppc/config.toml
//! 4. System config: /etc/ppc-optimizer/config.toml
//! 5. Built-in defaults

use crate::config::{AutomationConfig, ConfigError, is_valid_profile_id};
use crate::env;
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration together with the file it came from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: AutomationConfig,
    pub source: Option<PathBuf>,
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the override if given, otherwise the first file in the hierarchy, otherwise
    /// the defaults. The result is validated.
    pub fn load(config_override: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        let source = match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        let config = match &source {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                AutomationConfig::from_toml_file(path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                AutomationConfig::default()
            }
        };
        config.validate()?;

        Ok(LoadedConfig { config, source })
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::first_existing(Self::get_config_candidates())
    }

    fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    pub fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from("/etc/ppc-optimizer/config.toml"));

        #[cfg(windows)]
        if let Ok(program_data) = std_env::var("PROGRAMDATA") {
            candidates.push(
                PathBuf::from(program_data)
                    .join("ppc-optimizer")
                    .join(env::CONFIG_FILE_NAME),
            );
        }

        candidates
    }

    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Create a default config file in the user's home directory
    pub fn create_default_user_config() -> Result<PathBuf, ConfigError> {
        let home_dir = Self::get_home_dir()
            .ok_or_else(|| ConfigError::Invalid("could not determine home directory".to_string()))?;
        Self::create_default_config_in(&home_dir)
    }

    /// Write the default configuration under `home_dir`, leaving an existing file alone.
    pub fn create_default_config_in(home_dir: &Path) -> Result<PathBuf, ConfigError> {
        let config_dir = env::user_config_dir_path(home_dir);
        let config_path = env::user_config_file_path(home_dir);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|source| ConfigError::Write {
                path: config_dir.clone(),
                source,
            })?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !config_path.exists() {
            AutomationConfig::default().to_toml_file(&config_path)?;
            info!("Created default configuration file: {:?}", config_path);
        } else {
            warn!("Configuration file already exists: {:?}", config_path);
        }

        Ok(config_path)
    }

    /// Profile id precedence: command line, then configuration, then the environment
    /// value read at startup.
    pub fn resolve_profile_id(
        cli_value: Option<&str>,
        config: &AutomationConfig,
        env_value: Option<String>,
    ) -> Result<String, ConfigError> {
        let profile_id = cli_value
            .map(str::to_string)
            .or_else(|| config.automation.profile_id.clone())
            .or(env_value)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "no profile id: pass --profile-id, set automation.profile_id or {}",
                    env::vars::PROFILE_ID
                ))
            })?;

        if !is_valid_profile_id(&profile_id) {
            return Err(ConfigError::Invalid(format!(
                "profile id '{}' is not numeric",
                profile_id
            )));
        }
        Ok(profile_id)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_candidates() {
        let candidates = ConfigDiscovery::get_config_candidates();
        assert!(!candidates.is_empty());
        assert_eq!(
            candidates[0].file_name().unwrap(),
            env::LOCAL_CONFIG_FILE_NAME
        );
        assert!(candidates[1].ends_with(".ppc/config.toml"));
    }

    #[test]
    fn test_first_existing_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        let dir_candidate = temp_dir.path().join("config.toml");
        fs::create_dir(&dir_candidate).unwrap();
        let file_candidate = temp_dir.path().join("ppc-optimizer.toml");
        fs::write(&file_candidate, "").unwrap();

        let found = ConfigDiscovery::first_existing(vec![
            temp_dir.path().join("missing.toml"),
            dir_candidate,
            file_candidate.clone(),
        ]);
        assert_eq!(found, Some(file_candidate));
    }

    #[test]
    fn test_load_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ads.toml");
        fs::write(&path, "[campaign_management]\nacos_threshold = 0.3\n").unwrap();

        let loaded = ConfigDiscovery::load(Some(&path)).unwrap();
        assert_eq!(loaded.source, Some(path));
        assert_eq!(loaded.config.campaign_management.acos_threshold, 0.3);
    }

    #[test]
    fn test_load_rejects_invalid_override() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ads.toml");
        fs::write(&path, "[bid_optimization]\nmin_bid = 9.0\n").unwrap();
        assert!(matches!(
            ConfigDiscovery::load(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));

        assert!(matches!(
            ConfigDiscovery::load(Some(&temp_dir.path().join("missing.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_create_default_config_in() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigDiscovery::create_default_config_in(temp_dir.path()).unwrap();
        assert!(path.ends_with(".ppc/config.toml"));
        let loaded = AutomationConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded, AutomationConfig::default());

        // A second call keeps the existing file
        fs::write(&path, "[keyword_discovery]\ninitial_bid = 1.0\n").unwrap();
        ConfigDiscovery::create_default_config_in(temp_dir.path()).unwrap();
        let kept = AutomationConfig::from_toml_file(&path).unwrap();
        assert_eq!(kept.keyword_discovery.initial_bid, 1.0);
    }

    #[test]
    fn test_resolve_profile_id_precedence() {
        let mut config = AutomationConfig::default();
        assert_eq!(
            ConfigDiscovery::resolve_profile_id(None, &config, Some("333".to_string())).unwrap(),
            "333"
        );

        config.automation.profile_id = Some("222".to_string());
        assert_eq!(
            ConfigDiscovery::resolve_profile_id(None, &config, Some("333".to_string())).unwrap(),
            "222"
        );
        assert_eq!(
            ConfigDiscovery::resolve_profile_id(Some("111"), &config, None).unwrap(),
            "111"
        );
    }

    #[test]
    fn test_resolve_profile_id_errors() {
        let config = AutomationConfig::default();
        assert!(ConfigDiscovery::resolve_profile_id(None, &config, None).is_err());
        assert!(ConfigDiscovery::resolve_profile_id(Some("  "), &config, None).is_err());
        let err = ConfigDiscovery::resolve_profile_id(Some("ENTITY123"), &config, None).unwrap_err();
        assert!(err.to_string().contains("not numeric"));
    }
}
