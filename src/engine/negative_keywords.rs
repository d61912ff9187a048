use crate::api::AdsError;
use crate::audit::{ActionType, AuditEntry, EntityType};
use crate::config::NegativeKeywordConfig;
use crate::engine::context::{RunContext, days_before, elapsed_seconds, listing};
use crate::engine::search_terms::{QueryNormalizer, SearchTerm};
use crate::model::{
    EntityState, MatchType, NewNegativeKeyword, ReportRequest, format_ratio, format_usd,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NegativeKeywordReport {
    pub negative_keywords_added: usize,
    pub execution_time_seconds: f64,
}

/// Blocks search terms that spend without converting, as campaign-level negative phrases.
#[derive(Debug, Clone)]
pub struct NegativeKeywordManager {
    config: NegativeKeywordConfig,
    normalizer: QueryNormalizer,
}

impl NegativeKeywordManager {
    pub fn new(config: NegativeKeywordConfig) -> Result<Self, AdsError> {
        Ok(Self {
            config,
            normalizer: QueryNormalizer::new()?,
        })
    }

    pub fn report_requests(&self, today: NaiveDate) -> Vec<ReportRequest> {
        vec![ReportRequest::search_terms(days_before(today, 1))]
    }

    pub fn is_poor_performer(&self, term: &SearchTerm) -> bool {
        term.metrics.cost >= self.config.min_spend && term.metrics.acos() >= self.config.max_acos
    }

    pub async fn run(&self, ctx: &RunContext<'_>) -> Result<NegativeKeywordReport, AdsError> {
        let started = std::time::Instant::now();
        info!("=== Starting Negative Keyword Management ===");
        let mut report = NegativeKeywordReport::default();

        let request = ReportRequest::search_terms(ctx.yesterday());
        let table = match ctx.report(request).await {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to get search term report: {}", e);
                return Ok(report);
            }
        };

        let Some(existing) = listing(
            ctx.api.list_negative_keywords(None).await,
            "negative keywords",
        )?
        else {
            return Ok(report);
        };
        let mut known: HashSet<(String, String)> = existing
            .iter()
            .map(|n| {
                (
                    n.campaign_id.clone(),
                    self.normalizer.normalize(&n.keyword_text),
                )
            })
            .collect();
        debug!("Indexed {} existing negative keywords", known.len());

        let mut candidates = Vec::new();
        for term in table.rows.iter().filter_map(|row| self.normalizer.parse_row(row)) {
            if !self.is_poor_performer(&term) {
                continue;
            }
            if !known.insert((term.campaign_id.clone(), term.query.clone())) {
                continue;
            }

            ctx.audit
                .record(
                    AuditEntry::new(
                        ActionType::NegativeKeywordAdd,
                        EntityType::NegativeKeyword,
                        term.campaign_id.clone(),
                    )
                    .values("", term.query.clone())
                    .reason(format!(
                        "Poor performer: {} spend, ACOS {}",
                        format_usd(term.metrics.cost),
                        format_ratio(term.metrics.acos())
                    ))
                    .dry_run(ctx.dry_run),
                )
                .await;

            candidates.push(NewNegativeKeyword {
                campaign_id: term.campaign_id,
                keyword_text: term.query,
                match_type: MatchType::NegativePhrase,
                state: EntityState::Enabled,
            });
        }

        info!("Found {} negative keyword candidates", candidates.len());

        if ctx.dry_run {
            report.negative_keywords_added = candidates.len();
        } else if !candidates.is_empty() {
            let outcome = ctx.api.create_negative_keywords(candidates).await?;
            report.negative_keywords_added = outcome.succeeded;
        }

        report.execution_time_seconds = elapsed_seconds(started);
        info!(
            "Negative keyword management complete in {:.2}s: {:?}",
            report.execution_time_seconds, report
        );
        Ok(report)
    }
}
