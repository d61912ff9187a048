//! Decision stages. Each stage reads performance reports and current entity state
//! through [`AdsApi`](crate::api::AdsApi), audits every decision, and applies its
//! mutations in one batch at the end unless the run is a dry run.

pub mod bid_optimizer;
pub mod campaign_manager;
pub mod context;
pub mod dayparting;
pub mod keyword_discovery;
pub mod negative_keywords;
pub mod search_terms;
pub mod verification;


pub use bid_optimizer::{BidDecision, BidDirection, BidOptimizationReport, BidOptimizer};
pub use campaign_manager::{CampaignAction, CampaignManagementReport, CampaignManager};
pub use context::{Prefetched, RunContext};
pub use dayparting::{BaseBidStore, DaypartingManager, DaypartingReport, InMemoryBaseBidStore};
pub use keyword_discovery::{KeywordDiscovery, KeywordDiscoveryReport};
pub use negative_keywords::{NegativeKeywordManager, NegativeKeywordReport};
pub use search_terms::{QueryNormalizer, SearchTerm};
pub use verification::{VerificationResult, VerificationStatus, verify_bid_change};
