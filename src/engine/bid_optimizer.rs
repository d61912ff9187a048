use crate::api::AdsError;
use crate::audit::{ActionType, AuditEntry, EntityType};
use crate::config::BidOptimizationConfig;
use crate::engine::context::{RunContext, days_before, elapsed_seconds, listing};
use crate::engine::verification::verify_bid_change;
use crate::model::{
    KeywordFilter, KeywordUpdate, PerformanceMetrics, ReportRequest, columns, exceeds_dead_band,
    format_ratio, format_usd,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidDecision {
    pub old_bid: f64,
    pub new_bid: f64,
    pub direction: BidDirection,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidOptimizationReport {
    pub keywords_analyzed: usize,
    pub bids_increased: usize,
    pub bids_decreased: usize,
    pub no_change: usize,
    pub updates_succeeded: usize,
    pub updates_failed: usize,
    pub verification_warnings: usize,
    pub execution_time_seconds: f64,
}

/// Performance-driven keyword bid adjustment.
#[derive(Debug, Clone)]
pub struct BidOptimizer {
    config: BidOptimizationConfig,
}

impl BidOptimizer {
    pub fn new(config: BidOptimizationConfig) -> Self {
        Self { config }
    }

    /// One daily keyword report per lookback day, most recent first.
    pub fn report_requests(&self, today: NaiveDate) -> Vec<ReportRequest> {
        (1..=self.config.lookback_days.max(1) as u64)
            .map(|days| ReportRequest::keyword_performance(days_before(today, days)))
            .collect()
    }

    /// Decide the new bid for a keyword. `None` means no change: not enough signal,
    /// ACOS inside the band, or a change within the one-cent dead band.
    pub fn decide(&self, current_bid: f64, metrics: &PerformanceMetrics) -> Option<BidDecision> {
        let config = &self.config;
        if metrics.clicks < config.min_clicks && metrics.cost < config.min_spend {
            return None;
        }

        let acos = metrics.acos();
        let target = if !metrics.has_sales() && metrics.clicks >= config.min_clicks {
            current_bid * (1.0 - config.down_pct)
        } else if acos > config.high_acos {
            current_bid * (1.0 - config.down_pct)
        } else if acos < config.low_acos && metrics.has_sales() {
            current_bid * (1.0 + config.up_pct)
        } else {
            return None;
        };

        let new_bid = config.limits().clamp(target);
        if !exceeds_dead_band(current_bid, new_bid) {
            return None;
        }

        let direction = if new_bid > current_bid {
            BidDirection::Increase
        } else {
            BidDirection::Decrease
        };

        Some(BidDecision {
            old_bid: current_bid,
            new_bid,
            direction,
            reason: self.reason(metrics),
        })
    }

    fn reason(&self, metrics: &PerformanceMetrics) -> String {
        let acos = metrics.acos();
        if !metrics.has_sales() {
            format!("No sales after {} clicks", metrics.clicks)
        } else if acos > self.config.high_acos {
            format!("High ACOS ({}) - reducing bid", format_ratio(acos))
        } else if acos < self.config.low_acos {
            format!("Low ACOS ({}) - increasing bid", format_ratio(acos))
        } else {
            format!(
                "ACOS: {}, CTR: {:.2}%",
                format_ratio(acos),
                metrics.ctr() * 100.0
            )
        }
    }

    pub async fn run(&self, ctx: &RunContext<'_>) -> Result<BidOptimizationReport, AdsError> {
        let started = std::time::Instant::now();
        info!("=== Starting Bid Optimization ===");
        let mut report = BidOptimizationReport::default();

        let mut performance: HashMap<String, PerformanceMetrics> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for request in self.report_requests(ctx.today) {
            let name = request.name.clone();
            let table = match ctx.report(request).await {
                Ok(table) => table,
                Err(e) => {
                    error!("Failed to get keyword performance report {}: {}", name, e);
                    return Ok(report);
                }
            };
            for row in &table.rows {
                let Some(keyword_id) = row.get(columns::KEYWORD_ID) else {
                    continue;
                };
                let metrics = PerformanceMetrics::from_row(row);
                match performance.get_mut(keyword_id) {
                    Some(total) => *total += metrics,
                    None => {
                        order.push(keyword_id.to_string());
                        performance.insert(keyword_id.to_string(), metrics);
                    }
                }
            }
        }

        let Some(keywords) =
            listing(ctx.api.list_keywords(KeywordFilter::default()).await, "keywords")?
        else {
            return Ok(report);
        };
        let keyword_map: HashMap<&str, _> = keywords
            .iter()
            .map(|k| (k.keyword_id.as_str(), k))
            .collect();

        info!(
            "Processing {} keywords with performance data in batches of {}",
            order.len(),
            PROGRESS_INTERVAL
        );

        let limits = self.config.limits();
        let mut updates = Vec::new();

        for (index, keyword_id) in order.iter().enumerate() {
            if let Some(keyword) = keyword_map.get(keyword_id.as_str())
                && let Some(metrics) = performance.get(keyword_id)
            {
                report.keywords_analyzed += 1;

                match self.decide(keyword.bid, metrics) {
                    Some(decision) => {
                        if self.config.verify_calculations {
                            let check = verify_bid_change(
                                decision.old_bid,
                                decision.new_bid,
                                &limits,
                                self.config.max_change_pct,
                            );
                            if !check.is_passed() {
                                warn!("Verification for keyword {}: {}", keyword_id, check.message);
                                report.verification_warnings += 1;
                            }
                        }

                        match decision.direction {
                            BidDirection::Increase => report.bids_increased += 1,
                            BidDirection::Decrease => report.bids_decreased += 1,
                        }

                        ctx.audit
                            .record(
                                AuditEntry::new(
                                    ActionType::BidUpdate,
                                    EntityType::Keyword,
                                    keyword_id.clone(),
                                )
                                .values(format_usd(decision.old_bid), format_usd(decision.new_bid))
                                .reason(decision.reason)
                                .dry_run(ctx.dry_run),
                            )
                            .await;

                        updates.push(KeywordUpdate {
                            keyword_id: keyword_id.clone(),
                            bid: decision.new_bid,
                            state: None,
                        });
                    }
                    None => report.no_change += 1,
                }
            }

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!("Processed {}/{} records...", index + 1, order.len());
            }
        }

        if !updates.is_empty() && !ctx.dry_run {
            info!("Applying {} bid updates", updates.len());
            let outcome = ctx.api.batch_update_keywords(updates).await?;
            report.updates_succeeded = outcome.succeeded;
            report.updates_failed = outcome.failed;
        }

        report.execution_time_seconds = elapsed_seconds(started);
        info!(
            "Bid optimization complete in {:.2}s: {:?}",
            report.execution_time_seconds, report
        );
        Ok(report)
    }
}
