pub mod types;
pub mod client;
pub mod rate_limiter;
pub mod reports;
pub mod provider;


pub use types::*;
pub use client::AdsApiClient;
pub use rate_limiter::RateLimiter;
pub use reports::decode_report_payload;
pub use provider::AdsApi;
