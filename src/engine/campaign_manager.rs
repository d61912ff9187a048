use crate::api::AdsError;
use crate::audit::{ActionType, AuditEntry, EntityType};
use crate::config::CampaignManagementConfig;
use crate::engine::context::{RunContext, days_before, elapsed_seconds, listing};
use crate::model::{
    CampaignUpdate, EntityState, PerformanceMetrics, ReportRequest, columns, format_ratio,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignAction {
    Activate,
    Pause,
}

impl CampaignAction {
    pub fn target_state(self) -> EntityState {
        match self {
            CampaignAction::Activate => EntityState::Enabled,
            CampaignAction::Pause => EntityState::Paused,
        }
    }

    fn audit_action(self) -> ActionType {
        match self {
            CampaignAction::Activate => ActionType::CampaignActivate,
            CampaignAction::Pause => ActionType::CampaignPause,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignManagementReport {
    pub campaigns_activated: usize,
    pub campaigns_paused: usize,
    pub no_change: usize,
    pub updates_failed: usize,
    pub execution_time_seconds: f64,
}

/// Enables or pauses whole campaigns against an ACOS threshold.
#[derive(Debug, Clone)]
pub struct CampaignManager {
    config: CampaignManagementConfig,
}

impl CampaignManager {
    pub fn new(config: CampaignManagementConfig) -> Self {
        Self { config }
    }

    pub fn report_requests(&self, today: NaiveDate) -> Vec<ReportRequest> {
        vec![ReportRequest::campaign_performance(days_before(today, 1))]
    }

    /// Activate below the threshold, pause above it. Exactly at the threshold, or
    /// already in the target state, nothing changes.
    pub fn decide(
        &self,
        state: EntityState,
        metrics: &PerformanceMetrics,
    ) -> Option<CampaignAction> {
        if metrics.cost < self.config.min_spend {
            return None;
        }
        let acos = metrics.acos();
        if acos < self.config.acos_threshold && state != EntityState::Enabled {
            Some(CampaignAction::Activate)
        } else if acos > self.config.acos_threshold && state == EntityState::Enabled {
            Some(CampaignAction::Pause)
        } else {
            None
        }
    }

    pub async fn run(&self, ctx: &RunContext<'_>) -> Result<CampaignManagementReport, AdsError> {
        let started = std::time::Instant::now();
        info!("=== Starting Campaign Management ===");
        let mut report = CampaignManagementReport::default();

        let request = ReportRequest::campaign_performance(ctx.yesterday());
        let table = match ctx.report(request).await {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to get campaign performance report: {}", e);
                return Ok(report);
            }
        };

        let mut performance: HashMap<String, PerformanceMetrics> = HashMap::new();
        let mut order = Vec::new();
        for row in &table.rows {
            let Some(campaign_id) = row.get(columns::CAMPAIGN_ID) else {
                continue;
            };
            let metrics = PerformanceMetrics::from_row(row);
            match performance.get_mut(campaign_id) {
                Some(total) => *total += metrics,
                None => {
                    order.push(campaign_id.to_string());
                    performance.insert(campaign_id.to_string(), metrics);
                }
            }
        }

        let Some(campaigns) = listing(ctx.api.list_campaigns(None).await, "campaigns")? else {
            return Ok(report);
        };
        let states: HashMap<&str, EntityState> = campaigns
            .iter()
            .map(|c| (c.campaign_id.as_str(), c.state))
            .collect();

        let mut pending = Vec::new();
        for campaign_id in &order {
            let (Some(metrics), Some(state)) =
                (performance.get(campaign_id), states.get(campaign_id.as_str()))
            else {
                continue;
            };

            let Some(action) = self.decide(*state, metrics) else {
                report.no_change += 1;
                continue;
            };

            let acos = metrics.acos();
            let reason = match action {
                CampaignAction::Activate => format!(
                    "ACOS {} below threshold {}",
                    format_ratio(acos),
                    format_ratio(self.config.acos_threshold)
                ),
                CampaignAction::Pause => format!(
                    "ACOS {} above threshold {}",
                    format_ratio(acos),
                    format_ratio(self.config.acos_threshold)
                ),
            };
            match action {
                CampaignAction::Activate => report.campaigns_activated += 1,
                CampaignAction::Pause => report.campaigns_paused += 1,
            }

            ctx.audit
                .record(
                    AuditEntry::new(
                        action.audit_action(),
                        EntityType::Campaign,
                        campaign_id.clone(),
                    )
                    .values(state.as_str(), action.target_state().as_str())
                    .reason(reason)
                    .dry_run(ctx.dry_run),
                )
                .await;

            pending.push((campaign_id.clone(), action));
        }

        if !ctx.dry_run {
            for (campaign_id, action) in pending {
                let update = CampaignUpdate::state(action.target_state());
                match ctx.api.update_campaign(campaign_id.clone(), update).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Failed to update campaign {}: {}", campaign_id, e);
                        report.updates_failed += 1;
                    }
                }
            }
        }

        report.execution_time_seconds = elapsed_seconds(started);
        info!(
            "Campaign management complete in {:.2}s: {:?}",
            report.execution_time_seconds, report
        );
        Ok(report)
    }
}
