//! # Run Orchestration
//!
//! Runs the selected decision stages against one advertising profile, in a fixed
//! order, with one audit trail per run.
//!
//! ## Core Components
//!
//! - **[`PpcAutomation`]**: owns the stage modules and the API handle
//! - **[`Stage`]**: the five stages, ordered the way they run
//! - **[`RunSummary`]**: per-stage reports, failures and the audit file location
//!
//! ## Run Sequence
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PpcAutomation::run                    │
//! │  prefetch ─▶ bid_optimization ─▶ dayparting ─▶               │
//! │              campaign_management ─▶ keyword_discovery ─▶     │
//! │              negative_keywords ─▶ audit flush                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stages apply their mutations at their own end, so a later stage sees the entity
//! state from before the run. A stage error stops the remaining stages unless
//! `automation.continue_on_error` is set. The audit log is flushed either way.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ppc_optimizer::{AdsApiClient, AutomationConfig, Credentials, PpcAutomation};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AutomationConfig::default();
//!     let client = AdsApiClient::connect(
//!         config.api.clone(),
//!         config.reports.clone(),
//!         Credentials::from_env()?,
//!         "1234567890",
//!     )
//!     .await?;
//!
//!     let automation = PpcAutomation::new(config, Arc::new(client))?;
//!     let summary = automation.run(&[]).await;
//!     println!("{}", serde_json::to_string_pretty(&summary)?);
//!     Ok(())
//! }
//! ```

use crate::api::{AdsApi, AdsError};
use crate::audit::AuditLog;
use crate::config::AutomationConfig;
use crate::engine::{
    BaseBidStore, BidOptimizationReport, BidOptimizer, CampaignManagementReport,
    CampaignManager, DaypartingManager, DaypartingReport, KeywordDiscovery,
    KeywordDiscoveryReport, NegativeKeywordManager, NegativeKeywordReport, Prefetched,
    RunContext,
};
use crate::model::ReportRequest;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Stage {
    BidOptimization,
    Dayparting,
    CampaignManagement,
    KeywordDiscovery,
    NegativeKeywords,
}

impl Stage {
    /// Every stage in run order.
    pub const ALL: [Stage; 5] = [
        Stage::BidOptimization,
        Stage::Dayparting,
        Stage::CampaignManagement,
        Stage::KeywordDiscovery,
        Stage::NegativeKeywords,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::BidOptimization => "bid_optimization",
            Stage::Dayparting => "dayparting",
            Stage::CampaignManagement => "campaign_management",
            Stage::KeywordDiscovery => "keyword_discovery",
            Stage::NegativeKeywords => "negative_keywords",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageReport {
    BidOptimization(BidOptimizationReport),
    Dayparting(DaypartingReport),
    CampaignManagement(CampaignManagementReport),
    KeywordDiscovery(KeywordDiscoveryReport),
    NegativeKeywords(NegativeKeywordReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub stages: BTreeMap<Stage, StageReport>,
    pub errors: Vec<StageFailure>,
    /// Stages that were selected but never started because an earlier one failed
    pub skipped: Vec<Stage>,
    pub audit_entries: usize,
    pub audit_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.audit_error.is_none()
    }
}

/// The decision engine for one advertising profile.
pub struct PpcAutomation {
    config: AutomationConfig,
    api: Arc<dyn AdsApi>,
    bid_optimizer: BidOptimizer,
    dayparting: DaypartingManager,
    campaign_manager: CampaignManager,
    keyword_discovery: KeywordDiscovery,
    negative_keywords: NegativeKeywordManager,
}

impl PpcAutomation {
    pub fn new(config: AutomationConfig, api: Arc<dyn AdsApi>) -> Result<Self, AdsError> {
        Ok(Self {
            bid_optimizer: BidOptimizer::new(config.bid_optimization.clone()),
            dayparting: DaypartingManager::new(
                config.dayparting.clone(),
                config.bid_optimization.limits(),
            ),
            campaign_manager: CampaignManager::new(config.campaign_management.clone()),
            keyword_discovery: KeywordDiscovery::new(config.keyword_discovery.clone())?,
            negative_keywords: NegativeKeywordManager::new(config.negative_keywords.clone())?,
            config,
            api,
        })
    }

    /// Replace the dayparting base-bid store, e.g. to share one across instances.
    pub fn with_base_bid_store(mut self, store: Arc<dyn BaseBidStore>) -> Self {
        self.dayparting = DaypartingManager::with_store(
            self.config.dayparting.clone(),
            self.config.bid_optimization.limits(),
            store,
        );
        self
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Stages to run: the requested ones, or the configured features when none are
    /// requested, always in run order and without repeats.
    pub fn resolve_stages(&self, requested: &[Stage]) -> Vec<Stage> {
        let mut stages = if requested.is_empty() {
            self.config.automation.features.clone()
        } else {
            requested.to_vec()
        };
        stages.sort();
        stages.dedup();
        stages
    }

    pub async fn run(&self, requested: &[Stage]) -> RunSummary {
        self.run_at(requested, Utc::now()).await
    }

    /// Run as if the current time were `now`; reports cover the day before it.
    pub async fn run_at(&self, requested: &[Stage], now: DateTime<Utc>) -> RunSummary {
        let stages = self.resolve_stages(requested);
        let dry_run = self.config.automation.dry_run;
        let run_id = Uuid::new_v4();
        let audit = AuditLog::started_at(&self.config.automation.audit_dir, now);

        info!(
            "Starting PPC automation run {} ({}): {}",
            run_id,
            if dry_run { "dry run" } else { "live" },
            stages
                .iter()
                .map(Stage::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let today = now.date_naive();
        let prefetched = if self.config.automation.prefetch_reports {
            Some(self.prefetch(&stages, today).await)
        } else {
            None
        };

        let mut ctx = RunContext::new(self.api.as_ref(), &audit, dry_run, today);
        if let Some(prefetched) = &prefetched {
            ctx = ctx.with_prefetched(prefetched);
        }

        let mut reports = BTreeMap::new();
        let mut errors = Vec::new();
        let mut skipped = Vec::new();

        for (index, stage) in stages.iter().copied().enumerate() {
            match self.run_stage(stage, &ctx, now).await {
                Ok(report) => {
                    reports.insert(stage, report);
                }
                Err(e) => {
                    error!("Stage {} failed: {}", stage, e);
                    errors.push(StageFailure {
                        stage,
                        error: e.to_string(),
                    });
                    if !self.config.automation.continue_on_error || e.is_fatal() {
                        skipped.extend_from_slice(&stages[index + 1..]);
                        if !skipped.is_empty() {
                            warn!("Skipping remaining stages: {:?}", skipped);
                        }
                        break;
                    }
                }
            }
        }

        let audit_entries = audit.len().await;
        let (audit_file, audit_error) = match audit.flush().await {
            Ok(path) => (path, None),
            Err(e) => {
                error!("Failed to write audit log: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let summary = RunSummary {
            run_id,
            started_at: now,
            finished_at: Utc::now(),
            dry_run,
            stages: reports,
            errors,
            skipped,
            audit_entries,
            audit_file,
            audit_error,
        };
        info!(
            "Run {} finished: {} stages completed, {} failed, {} audit entries",
            run_id,
            summary.stages.len(),
            summary.errors.len(),
            summary.audit_entries
        );
        summary
    }

    async fn run_stage(
        &self,
        stage: Stage,
        ctx: &RunContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<StageReport, AdsError> {
        Ok(match stage {
            Stage::BidOptimization => StageReport::BidOptimization(self.bid_optimizer.run(ctx).await?),
            Stage::Dayparting => StageReport::Dayparting(self.dayparting.apply_at(ctx, now).await?),
            Stage::CampaignManagement => {
                StageReport::CampaignManagement(self.campaign_manager.run(ctx).await?)
            }
            Stage::KeywordDiscovery => {
                StageReport::KeywordDiscovery(self.keyword_discovery.run(ctx).await?)
            }
            Stage::NegativeKeywords => {
                StageReport::NegativeKeywords(self.negative_keywords.run(ctx).await?)
            }
        })
    }

    /// Report requests of the given stages, deduplicated by name.
    pub fn report_requests(&self, stages: &[Stage], today: chrono::NaiveDate) -> Vec<ReportRequest> {
        let mut seen = HashSet::new();
        stages
            .iter()
            .flat_map(|stage| match stage {
                Stage::BidOptimization => self.bid_optimizer.report_requests(today),
                Stage::Dayparting => Vec::new(),
                Stage::CampaignManagement => self.campaign_manager.report_requests(today),
                Stage::KeywordDiscovery => self.keyword_discovery.report_requests(today),
                Stage::NegativeKeywords => self.negative_keywords.report_requests(today),
            })
            .filter(|request| seen.insert(request.name.clone()))
            .collect()
    }

    async fn prefetch(&self, stages: &[Stage], today: chrono::NaiveDate) -> Prefetched {
        let requests = self.report_requests(stages, today);
        if requests.is_empty() {
            return Prefetched::default();
        }
        info!("Prefetching {} reports", requests.len());
        let tables = self
            .api
            .fetch_reports_parallel(requests.clone(), self.config.reports.max_workers)
            .await;
        if tables.len() < requests.len() {
            warn!(
                "{} of {} prefetched reports are unavailable",
                requests.len() - tables.len(),
                requests.len()
            );
        }
        Prefetched::new(&requests, tables)
    }
}
