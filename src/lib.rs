//! # PPC Optimizer
//!
//! Performance-driven bid and campaign automation for sponsored-products advertising.
//! Each run pulls yesterday's performance reports, decides bid, state and keyword
//! changes from configurable thresholds, applies them in platform-sized batches,
//! and writes every decision to a CSV audit trail.
//!
//! ## Architecture Overview
//!
//! - **[`api`]**: advertising API client with OAuth refresh, rate limiting, retries,
//!   batching and the asynchronous report pipeline
//! - **[`engine`]**: the decision stages (bids, dayparting, campaign state, keyword
//!   discovery, negative keywords)
//! - **[`automation`]**: runs the selected stages in order and flushes the audit log
//! - **[`audit`]**: decision records and their CSV persistence
//! - **[`config`]**: typed TOML configuration with defaults and validation
//! - **[`model`]**: entities, performance metrics and report tables
//!
//! ## Features
//!
//! ### Decision stages
//! - **Bid optimization**: ACOS bands with a one-cent dead band and bid limits
//! - **Dayparting**: weekday and hour multipliers applied to remembered base bids
//! - **Campaign management**: enable or pause campaigns against an ACOS threshold
//! - **Keyword discovery**: promote converting search terms to exact keywords
//! - **Negative keywords**: block search terms that spend without converting
//!
//! ### Platform access
//! - **Token bucket**: sustained rate with a small burst, shared by all requests
//! - **Retries**: bounded backoff with jitter for throttling, server and network errors
//! - **Reports**: create, poll with backoff, download ZIP/GZIP/plain CSV, bounded fan-out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ppc_optimizer::{AdsApiClient, AutomationConfig, Credentials, PpcAutomation, Stage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = AutomationConfig::default();
//!     config.automation.dry_run = true;
//!
//!     let client = AdsApiClient::connect(
//!         config.api.clone(),
//!         config.reports.clone(),
//!         Credentials::from_env()?,
//!         "1234567890",
//!     )
//!     .await?;
//!
//!     let automation = PpcAutomation::new(config, Arc::new(client))?;
//!     let summary = automation.run(&[Stage::BidOptimization]).await;
//!     println!("{} audit entries", summary.audit_entries);
//!     Ok(())
//! }
//! ```

/// Advertising API access.
///
/// OAuth token refresh, rate limiting, retry with backoff, paginated listing,
/// batched mutations and the create/poll/download report pipeline.
pub mod api;

/// Audit trail of engine decisions.
pub mod audit;

/// Run orchestration over the decision stages.
pub mod automation;

/// Command line parsing and configuration discovery.
pub mod cli;

/// Typed configuration with defaults and validation.
pub mod config;

/// Decision stages.
pub mod engine;

/// Endpoints, environment variable names and file locations.
pub mod env;

/// Advertising entities, metrics and report tables.
pub mod model;

pub use api::{AdsApi, AdsApiClient, AdsError, ApiConfig, Credentials, RateLimiter, Region};
pub use audit::{ActionType, AuditEntry, AuditLog, EntityType};
pub use automation::{PpcAutomation, RunSummary, Stage, StageReport};
pub use config::{AutomationConfig, ConfigError};
pub use engine::{
    BaseBidStore, BidOptimizer, CampaignManager, DaypartingManager, InMemoryBaseBidStore,
    KeywordDiscovery, NegativeKeywordManager,
};
