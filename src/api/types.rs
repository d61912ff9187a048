use crate::env;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Advertising API region. Each region has its own resource endpoint and token host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    NA,
    EU,
    FE,
}

impl Region {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Region::NA => env::api::NA_ENDPOINT,
            Region::EU => env::api::EU_ENDPOINT,
            Region::FE => env::api::FE_ENDPOINT,
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            Region::NA => env::api::NA_TOKEN_URL,
            Region::EU => env::api::EU_TOKEN_URL,
            Region::FE => env::api::FE_TOKEN_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub region: Region,
    pub max_requests_per_second: f64,
    pub burst_size: u32,
    /// Retries after the first attempt for 429/5xx/network failures
    pub max_retries: u32,
    /// Linear backoff unit: attempt `n` waits `n * retry_base_delay_ms` plus jitter
    pub retry_base_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Page size for list endpoints
    pub page_size: u32,
    /// Overrides the region endpoint (sandbox or test servers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Overrides the region token URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            region: Region::NA,
            max_requests_per_second: env::api::DEFAULT_MAX_REQUESTS_PER_SECOND as f64,
            burst_size: 3,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 30,
            page_size: 5000,
            endpoint: None,
            token_url: None,
        }
    }
}

impl ApiConfig {
    pub fn base_url(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.region.endpoint())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn token_endpoint(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| self.region.token_url().to_string())
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Report status polling schedule.
///
/// The first wait is `initial_interval_secs`, each following wait grows by
/// `backoff_multiplier` up to `max_interval_secs`. No wait extends past `timeout_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPollConfig {
    pub initial_interval_secs: f64,
    pub backoff_multiplier: f64,
    pub max_interval_secs: f64,
    pub timeout_secs: f64,
}

impl Default for ReportPollConfig {
    fn default() -> Self {
        Self {
            initial_interval_secs: 2.0,
            backoff_multiplier: 1.5,
            max_interval_secs: 10.0,
            timeout_secs: 300.0,
        }
    }
}

impl ReportPollConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_secs_f64(self.initial_interval_secs.max(0.0))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }

    /// Interval following `current`, capped at the configured maximum.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.backoff_multiplier;
        Duration::from_secs_f64(grown.min(self.max_interval_secs).max(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Concurrent wait/download workers for multi-report fetches
    pub max_workers: usize,
    pub poll: ReportPollConfig,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            max_workers: 3,
            poll: ReportPollConfig::default(),
        }
    }
}

/// Login-with-Amazon application credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Read credentials from the process environment. Only the binary entry point
    /// should call this; everything else receives `Credentials` by value.
    pub fn from_env() -> Result<Self, AdsError> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let client_id = read(env::vars::CLIENT_ID);
        let client_secret = read(env::vars::CLIENT_SECRET);
        let refresh_token = read(env::vars::REFRESH_TOKEN);

        match (client_id, client_secret, refresh_token) {
            (Some(id), Some(secret), Some(token)) => Ok(Self::new(id, secret, token)),
            (id, secret, token) => {
                let missing: Vec<&str> = [
                    (id.is_none(), env::vars::CLIENT_ID),
                    (secret.is_none(), env::vars::CLIENT_SECRET),
                    (token.is_none(), env::vars::REFRESH_TOKEN),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(AdsError::MissingCredentials(missing.join(", ")))
            }
        }
    }

    pub fn validate(&self) -> Result<(), AdsError> {
        let missing: Vec<&str> = [
            (self.client_id.trim().is_empty(), "client_id"),
            (self.client_secret.trim().is_empty(), "client_secret"),
            (self.refresh_token.trim().is_empty(), "refresh_token"),
        ]
        .into_iter()
        .filter_map(|(absent, name)| absent.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AdsError::MissingCredentials(missing.join(", ")))
        }
    }
}

/// Short-lived access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl Auth {
    /// True once `now` is within the expiry margin of `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at - ChronoDuration::seconds(env::api::TOKEN_EXPIRY_MARGIN_SECS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

impl TokenResponse {
    pub fn into_auth(self, issued_at: DateTime<Utc>) -> Auth {
        Auth {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at: issued_at + ChronoDuration::seconds(self.expires_in),
        }
    }
}

/// Tally of a chunked mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Ids assigned to created entities; empty for updates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_ids: Vec<String>,
}

impl BatchOutcome {
    pub fn merge(&mut self, other: BatchOutcome) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.created_ids.extend(other.created_ids);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSample {
    pub campaign_id: String,
    pub name: String,
    pub state: String,
    pub daily_budget: f64,
}

/// Result of [`AdsApiClient::verify_connection`](super::AdsApiClient::verify_connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub success: bool,
    #[serde(default)]
    pub campaign_count: usize,
    #[serde(default)]
    pub sample: Vec<CampaignSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AdsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("Request rejected with status {status}: {body}")]
    Client { status: u16, body: String },
    #[error("Mutation rejected ({code}): {details}")]
    Rejected { code: String, details: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Report {report_id} failed: {details}")]
    ReportFailed { report_id: String, details: String },
    #[error("Report {report_id} not ready after {waited_secs:.1}s")]
    ReportTimeout { report_id: String, waited_secs: f64 },
    #[error("Report '{0}' is unavailable")]
    ReportUnavailable(String),
    #[error("Failed to decode payload: {0}")]
    Decode(String),
    #[error("Invalid API configuration: {0}")]
    Config(String),
}

impl AdsError {
    /// Transient failures worth another attempt at the transport layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdsError::RateLimited { .. }
                | AdsError::Server { .. }
                | AdsError::Network(_)
                | AdsError::Timeout(_)
        )
    }

    /// Misconfiguration that no retry or later stage can recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdsError::MissingCredentials(_) | AdsError::Authentication(_) | AdsError::Config(_)
        )
    }

    /// Failures of the create/poll/download sequence.
    pub fn is_report_failure(&self) -> bool {
        matches!(
            self,
            AdsError::ReportFailed { .. }
                | AdsError::ReportTimeout { .. }
                | AdsError::ReportUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for AdsError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AdsError::Timeout(error.to_string())
        } else if error.is_decode() {
            AdsError::Decode(error.to_string())
        } else {
            AdsError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for AdsError {
    fn from(error: serde_json::Error) -> Self {
        AdsError::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_margin() {
        let now = Utc::now();
        let auth = Auth {
            access_token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: now + ChronoDuration::seconds(90),
        };
        assert!(!auth.is_expired_at(now));
        assert!(!auth.is_expired_at(now + ChronoDuration::seconds(29)));
        assert!(auth.is_expired_at(now + ChronoDuration::seconds(31)));
        assert_eq!(auth.header_value(), "Bearer tok");
    }

    #[test]
    fn test_poll_interval_growth_is_capped() {
        let poll = ReportPollConfig::default();
        let first = poll.initial_interval();
        assert_eq!(first, Duration::from_secs(2));
        let second = poll.next_interval(first);
        assert_eq!(second, Duration::from_secs(3));
        let third = poll.next_interval(second);
        assert_eq!(third, Duration::from_millis(4500));
        assert_eq!(poll.next_interval(Duration::from_secs(9)), Duration::from_secs(10));
    }

    #[test]
    fn test_region_endpoints() {
        assert_eq!(Region::default(), Region::NA);
        assert!(Region::EU.endpoint().contains("-eu"));
        assert!(Region::FE.token_url().ends_with("/auth/o2/token"));

        let config = ApiConfig {
            endpoint: Some("http://127.0.0.1:9999/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_credentials_validation_names_missing_fields() {
        let creds = Credentials::new("id", "", " ");
        match creds.validate() {
            Err(AdsError::MissingCredentials(missing)) => {
                assert_eq!(missing, "client_secret, refresh_token");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!format!("{:?}", Credentials::new("id", "secret", "token")).contains("secret\""));
    }

    #[test]
    fn test_error_classification() {
        assert!(AdsError::RateLimited { attempts: 4 }.is_retryable());
        assert!(AdsError::Server { status: 503, body: String::new() }.is_retryable());
        assert!(!AdsError::Client { status: 400, body: String::new() }.is_retryable());
        assert!(AdsError::Authentication("bad".into()).is_fatal());
        assert!(AdsError::ReportUnavailable("x".into()).is_report_failure());
    }

    #[test]
    fn test_batch_outcome_merge() {
        let mut total = BatchOutcome::default();
        total.merge(BatchOutcome {
            total: 100,
            succeeded: 98,
            failed: 2,
            created_ids: vec![],
        });
        total.merge(BatchOutcome {
            total: 3,
            succeeded: 3,
            failed: 0,
            created_ids: vec!["1".into()],
        });
        assert_eq!(total.total, 103);
        assert_eq!(total.failed, 2);
        assert_eq!(total.created_ids, vec!["1".to_string()]);
    }
}
