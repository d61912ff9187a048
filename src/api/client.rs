use crate::api::rate_limiter::RateLimiter;
use crate::api::types::{
    AdsError, ApiConfig, Auth, BatchOutcome, CampaignSample, ConnectionCheck, Credentials,
    ReportsConfig, TokenResponse,
};
use crate::env;
use crate::model::{
    AdGroup, Campaign, CampaignUpdate, EntityState, Keyword, KeywordFilter, KeywordUpdate,
    MutationResult, NegativeKeyword, NewAdGroup, NewCampaign, NewKeyword, NewNegativeKeyword,
};
use chrono::Utc;
use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Longest server-requested wait honored before retrying.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Authenticated, rate-limited client for the sponsored products API.
///
/// Campaign and ad group listings are cached for the lifetime of the client when
/// requested without a filter; mutations through this client invalidate them.
#[derive(Debug)]
pub struct AdsApiClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ApiConfig,
    pub(crate) reports: ReportsConfig,
    credentials: Credentials,
    profile_id: String,
    auth: Mutex<Option<Auth>>,
    rate_limiter: RateLimiter,
    campaign_cache: Mutex<Option<Vec<Campaign>>>,
    ad_group_cache: Mutex<Option<Vec<AdGroup>>>,
}

impl AdsApiClient {
    /// Build the client and exchange the refresh token for an access token.
    ///
    /// Missing credentials or a rejected token exchange are returned as fatal errors;
    /// neither is retried.
    pub async fn connect(
        config: ApiConfig,
        reports: ReportsConfig,
        credentials: Credentials,
        profile_id: impl Into<String>,
    ) -> Result<Self, AdsError> {
        let client = Self::new(config, reports, credentials, profile_id)?;
        let auth = client.authenticate().await?;
        *client.auth.lock().await = Some(auth);
        Ok(client)
    }

    /// Build the client without authenticating; the first request will.
    pub fn new(
        config: ApiConfig,
        reports: ReportsConfig,
        credentials: Credentials,
        profile_id: impl Into<String>,
    ) -> Result<Self, AdsError> {
        credentials.validate()?;
        let profile_id = profile_id.into();
        if profile_id.is_empty() || !profile_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AdsError::Config(format!(
                "profile id must be numeric, got '{}'",
                profile_id
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(env::USER_AGENT)
            .build()
            .map_err(|e| AdsError::Config(format!("failed to build HTTP client: {}", e)))?;

        let rate_limiter = RateLimiter::new(config.max_requests_per_second, config.burst_size);

        Ok(Self {
            http,
            config,
            reports,
            credentials,
            profile_id,
            auth: Mutex::new(None),
            rate_limiter,
            campaign_cache: Mutex::new(None),
            ad_group_cache: Mutex::new(None),
        })
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    async fn authenticate(&self) -> Result<Auth, AdsError> {
        let token_url = self.config.token_endpoint();
        debug!("Exchanging refresh token at {}", token_url);

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AdsError::Authentication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdsError::Authentication(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdsError::Authentication(format!("invalid token response: {}", e)))?;

        info!("Authenticated with the advertising API");
        Ok(token.into_auth(Utc::now()))
    }

    /// Current authorization header, refreshing the token first when it is within
    /// the expiry margin. Concurrent callers wait for a single refresh.
    async fn authorization(&self) -> Result<String, AdsError> {
        let mut auth = self.auth.lock().await;
        match auth.as_ref() {
            Some(current) if !current.is_expired() => Ok(current.header_value()),
            _ => {
                if auth.is_some() {
                    info!("Access token expiring, refreshing");
                }
                let fresh = self.authenticate().await?;
                let header = fresh.header_value();
                *auth = Some(fresh);
                Ok(header)
            }
        }
    }

    async fn invalidate_token(&self) {
        *self.auth.lock().await = None;
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.retry_base_delay() * attempt;
        let jitter_cap = (self.config.retry_base_delay_ms / 4).max(1);
        base + Duration::from_millis(rand::rng().random_range(0..jitter_cap))
    }

    /// Send one request with rate limiting, auth and retries.
    ///
    /// 429, 5xx and transport failures are retried up to `max_retries` times with
    /// linear backoff; a `Retry-After` header replaces the computed delay. A 401 drops
    /// the cached token and retries once. Any other non-success status fails at once.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, AdsError> {
        let url = format!("{}{}", self.config.base_url(), path);
        let max_attempts = self.config.max_retries + 1;
        let mut reauthenticated = false;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.rate_limiter.acquire().await;
            let authorization = self.authorization().await?;

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .header(AUTHORIZATION, authorization)
                .header(env::api::HEADER_CLIENT_ID, &self.credentials.client_id)
                .header(env::api::HEADER_SCOPE, &self.profile_id)
                .header(ACCEPT, "application/json");
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = &body {
                builder = builder.json(body);
            }

            debug!("{} {} (attempt {}/{})", method, path, attempt, max_attempts);

            let (error, retry_after) = match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    return Self::decode_body(response).await;
                }
                Ok(response) => {
                    let status = response.status();
                    let retry_after = parse_retry_after(&response);
                    let body = response.text().await.unwrap_or_default();

                    if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                        warn!("{} {} returned 401, refreshing token", method, path);
                        reauthenticated = true;
                        self.invalidate_token().await;
                        attempt -= 1;
                        continue;
                    }

                    let error = if status == StatusCode::TOO_MANY_REQUESTS {
                        AdsError::RateLimited { attempts: attempt }
                    } else if status.is_server_error() {
                        AdsError::Server {
                            status: status.as_u16(),
                            body,
                        }
                    } else if status == StatusCode::UNAUTHORIZED {
                        AdsError::Authentication(body)
                    } else {
                        AdsError::Client {
                            status: status.as_u16(),
                            body,
                        }
                    };
                    (error, retry_after)
                }
                Err(e) => (AdsError::from(e), None),
            };

            if !error.is_retryable() {
                warn!("{} {} failed: {}", method, path, error);
                return Err(error);
            }
            if attempt >= max_attempts {
                warn!(
                    "{} {} failed after {} attempts: {}",
                    method, path, attempt, error
                );
                return Err(error);
            }

            let delay = retry_after.unwrap_or_else(|| self.backoff_delay(attempt));
            warn!(
                "{} {} failed (attempt {}/{}): {}; retrying in {:?}",
                method, path, attempt, max_attempts, error, delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, AdsError> {
        let text = response.text().await?;
        let value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Walk a list endpoint with `startIndex`/`count` until a short page.
    async fn list_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        filters: Vec<(&str, String)>,
    ) -> Result<Vec<T>, AdsError> {
        let page_size = self.config.page_size.max(1) as usize;
        let mut items = Vec::new();
        let mut start_index = 0usize;

        loop {
            let mut query = filters.clone();
            query.push(("startIndex", start_index.to_string()));
            query.push(("count", page_size.to_string()));

            let page: Option<Vec<T>> = self.request(Method::GET, path, &query, None).await?;
            let page = page.unwrap_or_default();
            let fetched = page.len();
            items.extend(page);

            if fetched < page_size {
                break;
            }
            start_index += fetched;
        }

        debug!("Listed {} items from {}", items.len(), path);
        Ok(items)
    }

    pub async fn verify_connection(&self, sample_size: usize) -> ConnectionCheck {
        let query = [
            ("startIndex", "0".to_string()),
            ("count", sample_size.max(1).to_string()),
        ];
        match self
            .request::<Option<Vec<Campaign>>>(Method::GET, "/v2/sp/campaigns", &query, None)
            .await
        {
            Ok(campaigns) => {
                let campaigns = campaigns.unwrap_or_default();
                let sample = campaigns
                    .iter()
                    .take(sample_size)
                    .map(|c| CampaignSample {
                        campaign_id: c.campaign_id.clone(),
                        name: c.name.clone(),
                        state: c.state.to_string(),
                        daily_budget: c.daily_budget,
                    })
                    .collect();
                info!(
                    "Advertising API connectivity verified, retrieved {} campaigns",
                    campaigns.len()
                );
                ConnectionCheck {
                    success: true,
                    campaign_count: campaigns.len(),
                    sample,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Advertising API verification failed: {}", e);
                ConnectionCheck {
                    success: false,
                    campaign_count: 0,
                    sample: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn get_campaigns(
        &self,
        state_filter: Option<EntityState>,
    ) -> Result<Vec<Campaign>, AdsError> {
        if state_filter.is_none()
            && let Some(cached) = self.campaign_cache.lock().await.as_ref()
        {
            debug!("Using cached campaigns ({} items)", cached.len());
            return Ok(cached.clone());
        }

        let mut filters = Vec::new();
        if let Some(state) = state_filter {
            filters.push(("stateFilter", state.as_str().to_string()));
        }
        let campaigns: Vec<Campaign> = self.list_paginated("/v2/sp/campaigns", filters).await?;

        if state_filter.is_none() {
            *self.campaign_cache.lock().await = Some(campaigns.clone());
        }
        info!("Retrieved {} campaigns", campaigns.len());
        Ok(campaigns)
    }

    pub async fn invalidate_campaigns_cache(&self) {
        *self.campaign_cache.lock().await = None;
    }

    pub async fn update_campaign(
        &self,
        campaign_id: &str,
        update: &CampaignUpdate,
    ) -> Result<(), AdsError> {
        let mut item = serde_json::to_value(update)?;
        item["campaignId"] = id_value(campaign_id);

        let results: Vec<MutationResult> = self
            .request(
                Method::PUT,
                "/v2/sp/campaigns",
                &[],
                Some(serde_json::Value::Array(vec![item])),
            )
            .await?;

        first_success(results, campaign_id)?;
        self.invalidate_campaigns_cache().await;
        info!("Updated campaign {}", campaign_id);
        Ok(())
    }

    pub async fn create_campaign(&self, campaign: &NewCampaign) -> Result<String, AdsError> {
        let results: Vec<MutationResult> = self
            .request(Method::POST, "/v2/sp/campaigns", &[], Some(json_array(campaign)?))
            .await?;
        let result = first_success(results, &campaign.name)?;
        self.invalidate_campaigns_cache().await;
        let id = result.campaign_id.unwrap_or_default();
        info!("Created campaign {} ({})", campaign.name, id);
        Ok(id)
    }

    pub async fn get_ad_groups(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<AdGroup>, AdsError> {
        if campaign_id.is_none()
            && let Some(cached) = self.ad_group_cache.lock().await.as_ref()
        {
            debug!("Using cached ad groups ({} items)", cached.len());
            return Ok(cached.clone());
        }

        let mut filters = Vec::new();
        if let Some(id) = campaign_id {
            filters.push(("campaignIdFilter", id.to_string()));
        }
        let ad_groups: Vec<AdGroup> = self.list_paginated("/v2/sp/adGroups", filters).await?;

        if campaign_id.is_none() {
            *self.ad_group_cache.lock().await = Some(ad_groups.clone());
        }
        info!("Retrieved {} ad groups", ad_groups.len());
        Ok(ad_groups)
    }

    pub async fn invalidate_ad_groups_cache(&self) {
        *self.ad_group_cache.lock().await = None;
    }

    pub async fn create_ad_group(&self, ad_group: &NewAdGroup) -> Result<String, AdsError> {
        let results: Vec<MutationResult> = self
            .request(Method::POST, "/v2/sp/adGroups", &[], Some(json_array(ad_group)?))
            .await?;
        let result = first_success(results, &ad_group.name)?;
        self.invalidate_ad_groups_cache().await;
        let id = result.ad_group_id.unwrap_or_default();
        info!("Created ad group {} ({})", ad_group.name, id);
        Ok(id)
    }

    pub async fn get_keywords(&self, filter: &KeywordFilter) -> Result<Vec<Keyword>, AdsError> {
        let mut filters = Vec::new();
        if let Some(id) = &filter.campaign_id {
            filters.push(("campaignIdFilter", id.clone()));
        }
        if let Some(id) = &filter.ad_group_id {
            filters.push(("adGroupIdFilter", id.clone()));
        }
        let keywords: Vec<Keyword> = self.list_paginated("/v2/sp/keywords", filters).await?;
        info!("Retrieved {} keywords", keywords.len());
        Ok(keywords)
    }

    pub async fn update_keyword_bid(
        &self,
        keyword_id: &str,
        bid: f64,
        state: Option<EntityState>,
    ) -> Result<(), AdsError> {
        let update = KeywordUpdate {
            keyword_id: keyword_id.to_string(),
            bid,
            state,
        };
        let results: Vec<MutationResult> = self
            .request(Method::PUT, "/v2/sp/keywords", &[], Some(json_array(&update)?))
            .await?;
        first_success(results, keyword_id)?;
        Ok(())
    }

    /// Apply keyword updates in chunks of at most 100.
    ///
    /// Items are tallied from their per-item result code; items the response leaves
    /// out count as failed. A failing chunk is counted as failed in full and the
    /// remaining chunks are still sent.
    pub async fn batch_update_keywords(&self, updates: &[KeywordUpdate]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let batches = updates.chunks(env::api::MAX_BATCH_SIZE).len();

        for (index, chunk) in updates.chunks(env::api::MAX_BATCH_SIZE).enumerate() {
            let tally = self
                .submit_batch(Method::PUT, "/v2/sp/keywords", chunk, |r| {
                    r.keyword_id.clone()
                })
                .await;
            info!(
                "Keyword batch {}/{}: {} succeeded, {} failed",
                index + 1,
                batches,
                tally.succeeded,
                tally.failed
            );
            outcome.merge(tally);
        }

        outcome
    }

    pub async fn create_keywords(&self, keywords: &[NewKeyword]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for chunk in keywords.chunks(env::api::MAX_BATCH_SIZE) {
            let tally = self
                .submit_batch(Method::POST, "/v2/sp/keywords", chunk, |r| {
                    r.keyword_id.clone()
                })
                .await;
            outcome.merge(tally);
        }
        info!(
            "Created {} of {} keywords",
            outcome.succeeded, outcome.total
        );
        outcome
    }

    pub async fn get_negative_keywords(
        &self,
        campaign_id: Option<&str>,
    ) -> Result<Vec<NegativeKeyword>, AdsError> {
        let mut filters = Vec::new();
        if let Some(id) = campaign_id {
            filters.push(("campaignIdFilter", id.to_string()));
        }
        let negatives: Vec<NegativeKeyword> = self
            .list_paginated("/v2/sp/negativeKeywords", filters)
            .await?;
        info!("Retrieved {} negative keywords", negatives.len());
        Ok(negatives)
    }

    pub async fn create_negative_keywords(
        &self,
        negatives: &[NewNegativeKeyword],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for chunk in negatives.chunks(env::api::MAX_BATCH_SIZE) {
            let tally = self
                .submit_batch(Method::POST, "/v2/sp/negativeKeywords", chunk, |r| {
                    r.keyword_id.clone()
                })
                .await;
            outcome.merge(tally);
        }
        info!(
            "Created {} of {} negative keywords",
            outcome.succeeded, outcome.total
        );
        outcome
    }

    async fn submit_batch<T: Serialize>(
        &self,
        method: Method,
        path: &str,
        chunk: &[T],
        created_id: impl Fn(&MutationResult) -> Option<String>,
    ) -> BatchOutcome {
        let failed_all = BatchOutcome {
            total: chunk.len(),
            succeeded: 0,
            failed: chunk.len(),
            created_ids: Vec::new(),
        };

        let body = match serde_json::to_value(chunk) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize batch for {}: {}", path, e);
                return failed_all;
            }
        };

        let results: Vec<MutationResult> =
            match self.request(method.clone(), path, &[], Some(body)).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Batch of {} items to {} failed: {}", chunk.len(), path, e);
                    return failed_all;
                }
            };

        let mut succeeded = 0;
        let mut created_ids = Vec::new();
        for result in results.iter().take(chunk.len()) {
            if result.is_success() {
                succeeded += 1;
                if method == Method::POST
                    && let Some(id) = created_id(result)
                {
                    created_ids.push(id);
                }
            } else {
                warn!(
                    "Item rejected by {}: {} {}",
                    path,
                    result.code,
                    result.details.as_deref().unwrap_or("")
                );
            }
        }

        BatchOutcome {
            total: chunk.len(),
            succeeded,
            failed: chunk.len() - succeeded,
            created_ids,
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

fn id_value(id: &str) -> serde_json::Value {
    match id.parse::<u64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(id),
    }
}

fn json_array<T: Serialize>(item: &T) -> Result<serde_json::Value, AdsError> {
    Ok(serde_json::Value::Array(vec![serde_json::to_value(item)?]))
}

fn first_success(results: Vec<MutationResult>, entity: &str) -> Result<MutationResult, AdsError> {
    match results.into_iter().next() {
        Some(result) if result.is_success() => Ok(result),
        Some(result) => Err(AdsError::Rejected {
            code: result.code,
            details: result
                .details
                .unwrap_or_else(|| format!("mutation of {} rejected", entity)),
        }),
        None => Err(AdsError::Rejected {
            code: "EMPTY_RESPONSE".to_string(),
            details: format!("no result returned for {}", entity),
        }),
    }
}
