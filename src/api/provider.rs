use crate::api::client::AdsApiClient;
use crate::api::types::{AdsError, BatchOutcome};
use crate::model::{
    Campaign, CampaignUpdate, EntityState, Keyword, KeywordFilter, KeywordUpdate,
    NegativeKeyword, NewKeyword, NewNegativeKeyword, ReportRequest, ReportTable,
};
use futures::future::BoxFuture;
use std::collections::HashMap;

/// Operations the decision engine needs from the advertising platform.
///
/// [`AdsApiClient`] is the production implementation; tests drive the engine through
/// in-memory implementations.
pub trait AdsApi: Send + Sync {
    /// Create, wait for and download one report
    fn fetch_report(&self, request: ReportRequest) -> BoxFuture<'_, Result<ReportTable, AdsError>>;

    /// Fetch several reports, keyed by request name. Reports that could not be
    /// produced are absent from the map.
    ///
    /// The default implementation fetches one after the other.
    fn fetch_reports_parallel(
        &self,
        requests: Vec<ReportRequest>,
        max_workers: usize,
    ) -> BoxFuture<'_, HashMap<String, ReportTable>> {
        let _ = max_workers;
        Box::pin(async move {
            let mut tables = HashMap::new();
            for request in requests {
                let name = request.name.clone();
                match self.fetch_report(request).await {
                    Ok(table) => {
                        tables.insert(name, table);
                    }
                    Err(e) => tracing::warn!("Report {} unavailable: {}", name, e),
                }
            }
            tables
        })
    }

    fn list_campaigns(
        &self,
        state_filter: Option<EntityState>,
    ) -> BoxFuture<'_, Result<Vec<Campaign>, AdsError>>;

    fn list_keywords(&self, filter: KeywordFilter) -> BoxFuture<'_, Result<Vec<Keyword>, AdsError>>;

    fn list_negative_keywords(
        &self,
        campaign_id: Option<String>,
    ) -> BoxFuture<'_, Result<Vec<NegativeKeyword>, AdsError>>;

    fn update_campaign(
        &self,
        campaign_id: String,
        update: CampaignUpdate,
    ) -> BoxFuture<'_, Result<(), AdsError>>;

    /// Apply keyword updates in platform-sized chunks, tallying per-item results
    fn batch_update_keywords(
        &self,
        updates: Vec<KeywordUpdate>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>>;

    fn create_keywords(
        &self,
        keywords: Vec<NewKeyword>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>>;

    fn create_negative_keywords(
        &self,
        negatives: Vec<NewNegativeKeyword>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>>;
}

impl AdsApi for AdsApiClient {
    fn fetch_report(&self, request: ReportRequest) -> BoxFuture<'_, Result<ReportTable, AdsError>> {
        Box::pin(async move { AdsApiClient::fetch_report(self, &request).await })
    }

    fn fetch_reports_parallel(
        &self,
        requests: Vec<ReportRequest>,
        max_workers: usize,
    ) -> BoxFuture<'_, HashMap<String, ReportTable>> {
        Box::pin(async move {
            self.create_and_download_reports_parallel(&requests, max_workers)
                .await
        })
    }

    fn list_campaigns(
        &self,
        state_filter: Option<EntityState>,
    ) -> BoxFuture<'_, Result<Vec<Campaign>, AdsError>> {
        Box::pin(self.get_campaigns(state_filter))
    }

    fn list_keywords(&self, filter: KeywordFilter) -> BoxFuture<'_, Result<Vec<Keyword>, AdsError>> {
        Box::pin(async move { self.get_keywords(&filter).await })
    }

    fn list_negative_keywords(
        &self,
        campaign_id: Option<String>,
    ) -> BoxFuture<'_, Result<Vec<NegativeKeyword>, AdsError>> {
        Box::pin(async move { self.get_negative_keywords(campaign_id.as_deref()).await })
    }

    fn update_campaign(
        &self,
        campaign_id: String,
        update: CampaignUpdate,
    ) -> BoxFuture<'_, Result<(), AdsError>> {
        Box::pin(async move { AdsApiClient::update_campaign(self, &campaign_id, &update).await })
    }

    fn batch_update_keywords(
        &self,
        updates: Vec<KeywordUpdate>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>> {
        Box::pin(async move { Ok(AdsApiClient::batch_update_keywords(self, &updates).await) })
    }

    fn create_keywords(
        &self,
        keywords: Vec<NewKeyword>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>> {
        Box::pin(async move { Ok(AdsApiClient::create_keywords(self, &keywords).await) })
    }

    fn create_negative_keywords(
        &self,
        negatives: Vec<NewNegativeKeyword>,
    ) -> BoxFuture<'_, Result<BatchOutcome, AdsError>> {
        Box::pin(async move { Ok(AdsApiClient::create_negative_keywords(self, &negatives).await) })
    }
}
