//! Environment constants and path utilities for the PPC optimizer.
//!
//! This module centralizes hardcoded endpoints, environment variable names,
//! platform limits and file locations used throughout the application.

use std::path::{Path, PathBuf};

/// Main application directory name (hidden directory like .git, .vscode)
pub const PPC_DIR_NAME: &str = ".ppc";

/// Configuration file name inside [`PPC_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file looked up in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "ppc-optimizer.toml";

/// User agent sent with every advertising API request
pub const USER_AGENT: &str = concat!("ppc-optimizer/", env!("CARGO_PKG_VERSION"));

/// Environment variables read once at startup.
pub mod vars {
    pub const CLIENT_ID: &str = "AMAZON_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "AMAZON_CLIENT_SECRET";
    pub const REFRESH_TOKEN: &str = "AMAZON_REFRESH_TOKEN";
    pub const PROFILE_ID: &str = "AMAZON_PROFILE_ID";
}

/// Advertising platform limits and endpoints.
pub mod api {
    /// Maximum number of entities accepted by one mutation call.
    pub const MAX_BATCH_SIZE: usize = 100;

    /// Default sustained request rate.
    pub const DEFAULT_MAX_REQUESTS_PER_SECOND: u32 = 10;

    /// Seconds before expiry at which an access token is treated as expired.
    pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

    pub const NA_ENDPOINT: &str = "https://advertising-api.amazon.com";
    pub const EU_ENDPOINT: &str = "https://advertising-api-eu.amazon.com";
    pub const FE_ENDPOINT: &str = "https://advertising-api-fe.amazon.com";

    pub const NA_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
    pub const EU_TOKEN_URL: &str = "https://api.amazon.co.uk/auth/o2/token";
    pub const FE_TOKEN_URL: &str = "https://api.amazon.co.jp/auth/o2/token";

    pub const HEADER_CLIENT_ID: &str = "Amazon-Advertising-API-ClientId";
    pub const HEADER_SCOPE: &str = "Amazon-Advertising-API-Scope";
}

/// Audit trail file naming.
pub mod audit {
    /// Default directory for audit CSV files
    pub const DEFAULT_AUDIT_DIR: &str = "./logs";

    /// Prefix of every audit file name
    pub const AUDIT_FILE_PREFIX: &str = "ppc_audit";
}

/// Build the audit file path for a run started at `started_at`
pub fn audit_file_path(audit_dir: &Path, started_at: chrono::DateTime<chrono::Utc>) -> PathBuf {
    audit_dir.join(format!(
        "{}_{}.csv",
        audit::AUDIT_FILE_PREFIX,
        started_at.format("%Y%m%d_%H%M%S")
    ))
}

/// Build config directory path in user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(PPC_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(PPC_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.ppc/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.ppc/config.toml")
        );
    }

    #[test]
    fn test_audit_file_path() {
        let started = chrono::Utc.with_ymd_and_hms(2026, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(
            audit_file_path(Path::new("/var/ppc"), started),
            Path::new("/var/ppc/ppc_audit_20260307_140509.csv")
        );
    }
}
