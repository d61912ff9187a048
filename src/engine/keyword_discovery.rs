use crate::api::AdsError;
use crate::audit::{ActionType, AuditEntry, EntityType};
use crate::config::KeywordDiscoveryConfig;
use crate::engine::context::{RunContext, days_before, elapsed_seconds, listing};
use crate::engine::search_terms::{QueryNormalizer, SearchTerm};
use crate::model::{
    EntityState, KeywordFilter, MatchType, NewKeyword, ReportRequest, format_ratio,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordDiscoveryReport {
    pub keywords_discovered: usize,
    pub keywords_added: usize,
    pub execution_time_seconds: f64,
}

/// Promotes converting search terms to exact-match keywords.
#[derive(Debug, Clone)]
pub struct KeywordDiscovery {
    config: KeywordDiscoveryConfig,
    normalizer: QueryNormalizer,
}

impl KeywordDiscovery {
    pub fn new(config: KeywordDiscoveryConfig) -> Result<Self, AdsError> {
        Ok(Self {
            config,
            normalizer: QueryNormalizer::new()?,
        })
    }

    pub fn report_requests(&self, today: NaiveDate) -> Vec<ReportRequest> {
        vec![ReportRequest::search_terms(days_before(today, 1))]
    }

    /// A term qualifies on clicks and ACOS alone; zero sales means infinite ACOS and
    /// never qualifies.
    pub fn qualifies(&self, term: &SearchTerm) -> bool {
        term.metrics.clicks >= self.config.min_clicks
            && term.metrics.acos() <= self.config.max_acos
    }

    pub async fn run(&self, ctx: &RunContext<'_>) -> Result<KeywordDiscoveryReport, AdsError> {
        let started = std::time::Instant::now();
        info!("=== Starting Keyword Discovery ===");
        let mut report = KeywordDiscoveryReport::default();

        let request = ReportRequest::search_terms(ctx.yesterday());
        let table = match ctx.report(request).await {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to get search term report: {}", e);
                return Ok(report);
            }
        };

        let Some(existing) =
            listing(ctx.api.list_keywords(KeywordFilter::default()).await, "keywords")?
        else {
            return Ok(report);
        };
        let mut known: HashSet<(String, String, MatchType)> = existing
            .iter()
            .map(|k| {
                (
                    k.ad_group_id.clone(),
                    self.normalizer.normalize(&k.keyword_text),
                    k.match_type,
                )
            })
            .collect();
        debug!("Indexed {} existing keywords", known.len());

        let mut candidates = Vec::new();
        for term in table.rows.iter().filter_map(|row| self.normalizer.parse_row(row)) {
            if !self.qualifies(&term) {
                continue;
            }
            let Some(ad_group_id) = term.ad_group_id.clone() else {
                debug!("Search term '{}' has no ad group, skipping", term.query);
                continue;
            };
            if !known.insert((ad_group_id.clone(), term.query.clone(), MatchType::Exact)) {
                continue;
            }

            ctx.audit
                .record(
                    AuditEntry::new(ActionType::KeywordDiscovery, EntityType::Keyword, "NEW")
                        .values("", term.query.clone())
                        .reason(format!(
                            "Added from search term: {} clicks, ACOS {}",
                            term.metrics.clicks,
                            format_ratio(term.metrics.acos())
                        ))
                        .dry_run(ctx.dry_run),
                )
                .await;

            candidates.push(NewKeyword {
                campaign_id: term.campaign_id,
                ad_group_id,
                keyword_text: term.query,
                match_type: MatchType::Exact,
                state: EntityState::Enabled,
                bid: self.config.initial_bid,
            });
        }

        report.keywords_discovered = candidates.len();
        info!("Discovered {} new keywords", candidates.len());

        if ctx.dry_run {
            report.keywords_added = candidates.len();
        } else if !candidates.is_empty() {
            let outcome = ctx.api.create_keywords(candidates).await?;
            report.keywords_added = outcome.succeeded;
        }

        report.execution_time_seconds = elapsed_seconds(started);
        info!(
            "Keyword discovery complete in {:.2}s: {:?}",
            report.execution_time_seconds, report
        );
        Ok(report)
    }
}
