use crate::api::AdsError;
use crate::audit::{ActionType, AuditEntry, EntityType};
use crate::config::DaypartingConfig;
use crate::engine::context::{RunContext, listing};
use crate::model::{
    BidLimits, EntityState, KeywordFilter, KeywordUpdate, exceeds_dead_band, format_usd,
};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remembers each keyword's bid from before dayparting first touched it, so multipliers
/// are applied to that value and never compound.
pub trait BaseBidStore: Send + Sync {
    /// Stored base bid for `keyword_id`, recording `current_bid` if there is none yet.
    fn get_or_insert(&self, keyword_id: &str, current_bid: f64) -> f64;

    fn get(&self, keyword_id: &str) -> Option<f64>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Base bids held for the life of the process.
#[derive(Debug, Default)]
pub struct InMemoryBaseBidStore {
    bids: DashMap<String, f64>,
}

impl InMemoryBaseBidStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaseBidStore for InMemoryBaseBidStore {
    fn get_or_insert(&self, keyword_id: &str, current_bid: f64) -> f64 {
        *self
            .bids
            .entry(keyword_id.to_string())
            .or_insert(current_bid)
    }

    fn get(&self, keyword_id: &str) -> Option<f64> {
        self.bids.get(keyword_id).map(|bid| *bid)
    }

    fn clear(&self) {
        self.bids.clear();
    }

    fn len(&self) -> usize {
        self.bids.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaypartingReport {
    pub enabled: bool,
    pub keywords_updated: usize,
    pub updates_failed: usize,
    pub current_hour: Option<u32>,
    pub current_day: Option<String>,
    pub multiplier: Option<f64>,
    pub timezone: Option<String>,
}

pub struct DaypartingManager {
    config: DaypartingConfig,
    limits: BidLimits,
    store: Arc<dyn BaseBidStore>,
}

impl DaypartingManager {
    pub fn new(config: DaypartingConfig, limits: BidLimits) -> Self {
        Self::with_store(config, limits, Arc::new(InMemoryBaseBidStore::new()))
    }

    pub fn with_store(
        config: DaypartingConfig,
        limits: BidLimits,
        store: Arc<dyn BaseBidStore>,
    ) -> Self {
        Self {
            config,
            limits,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn BaseBidStore> {
        &self.store
    }

    /// Configured timezone, or UTC when the name does not resolve.
    pub fn timezone(&self) -> Tz {
        match self.config.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    "Unknown timezone '{}', falling back to UTC",
                    self.config.timezone
                );
                Tz::UTC
            }
        }
    }

    pub async fn run(&self, ctx: &RunContext<'_>) -> Result<DaypartingReport, AdsError> {
        self.apply_at(ctx, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        ctx: &RunContext<'_>,
        now: DateTime<Utc>,
    ) -> Result<DaypartingReport, AdsError> {
        if !self.config.enabled {
            info!("Dayparting is disabled");
            return Ok(DaypartingReport::default());
        }

        info!("=== Applying Dayparting ===");
        if self.config.reset_base_bids_each_run {
            debug!("Clearing {} remembered base bids", self.store.len());
            self.store.clear();
        }

        let tz = self.timezone();
        let local = now.with_timezone(&tz);
        let hour = local.hour();
        let day = local.format("%A").to_string().to_uppercase();
        let multiplier = self.config.multiplier(&day, hour);
        info!(
            "Current time: {} {}:00 {} (multiplier {:.2}x)",
            day,
            hour,
            tz.name(),
            multiplier
        );

        let mut report = DaypartingReport {
            enabled: true,
            current_hour: Some(hour),
            current_day: Some(day.clone()),
            multiplier: Some(multiplier),
            timezone: Some(tz.name().to_string()),
            ..Default::default()
        };

        let Some(keywords) =
            listing(ctx.api.list_keywords(KeywordFilter::default()).await, "keywords")?
        else {
            return Ok(report);
        };
        let mut updates = Vec::new();

        for keyword in keywords
            .iter()
            .filter(|k| k.state != EntityState::Archived)
        {
            let base_bid = self.store.get_or_insert(&keyword.keyword_id, keyword.bid);
            let new_bid = self.limits.clamp(base_bid * multiplier);
            if !exceeds_dead_band(keyword.bid, new_bid) {
                continue;
            }

            ctx.audit
                .record(
                    AuditEntry::new(
                        ActionType::DaypartingAdjustment,
                        EntityType::Keyword,
                        keyword.keyword_id.clone(),
                    )
                    .values(format_usd(keyword.bid), format_usd(new_bid))
                    .reason(format!(
                        "Dayparting: {} {}:00 {} ({:.2}x)",
                        day,
                        hour,
                        tz.name(),
                        multiplier
                    ))
                    .dry_run(ctx.dry_run),
                )
                .await;

            updates.push(KeywordUpdate {
                keyword_id: keyword.keyword_id.clone(),
                bid: new_bid,
                state: None,
            });
        }

        if updates.is_empty() {
            info!("No dayparting adjustments needed");
        } else if ctx.dry_run {
            report.keywords_updated = updates.len();
        } else {
            let outcome = ctx.api.batch_update_keywords(updates).await?;
            report.keywords_updated = outcome.succeeded;
            report.updates_failed = outcome.failed;
        }

        info!("Dayparting complete: {} keywords updated", report.keywords_updated);
        Ok(report)
    }
}
