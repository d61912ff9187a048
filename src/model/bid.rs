use serde::{Deserialize, Serialize};

/// Smallest bid change worth sending: anything at or below one cent is churn.
pub const BID_DEAD_BAND_CENTS: i64 = 1;

/// Bid expressed in whole cents, the unit the platform stores.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Round a USD amount to two decimals.
pub fn round_bid(amount: f64) -> f64 {
    to_cents(amount) as f64 / 100.0
}

/// True when moving from `old_bid` to `new_bid` is more than the one-cent dead band.
///
/// Compared in cents so that `1.00 -> 0.99` (a float delta of 0.0100000000000000089)
/// counts as exactly one cent.
pub fn exceeds_dead_band(old_bid: f64, new_bid: f64) -> bool {
    (to_cents(new_bid) - to_cents(old_bid)).abs() > BID_DEAD_BAND_CENTS
}

pub fn format_usd(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Inclusive bid bounds every engine write is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidLimits {
    pub min_bid: f64,
    pub max_bid: f64,
}

impl BidLimits {
    pub fn new(min_bid: f64, max_bid: f64) -> Self {
        Self { min_bid, max_bid }
    }

    /// Clamp into `[min_bid, max_bid]` and round to cents.
    pub fn clamp(&self, bid: f64) -> f64 {
        round_bid(bid.max(self.min_bid).min(self.max_bid))
    }

    pub fn contains(&self, bid: f64) -> bool {
        let cents = to_cents(bid);
        cents >= to_cents(self.min_bid) && cents <= to_cents(self.max_bid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_bid() {
        assert_eq!(round_bid(0.8000000001), 0.8);
        assert_eq!(round_bid(1.149), 1.15);
        assert_eq!(round_bid(1.0 * 1.15), 1.15);
    }

    #[test]
    fn test_dead_band() {
        assert!(!exceeds_dead_band(1.00, 1.00));
        assert!(!exceeds_dead_band(1.00, 0.99));
        assert!(!exceeds_dead_band(1.00, 1.01));
        assert!(exceeds_dead_band(1.00, 0.98));
        assert!(exceeds_dead_band(0.25, 0.30));
    }

    #[test]
    fn test_clamp() {
        let limits = BidLimits::new(0.25, 5.0);
        assert_eq!(limits.clamp(0.1), 0.25);
        assert_eq!(limits.clamp(7.3), 5.0);
        assert_eq!(limits.clamp(1.234), 1.23);
        assert!(limits.contains(0.25));
        assert!(limits.contains(5.0));
        assert!(!limits.contains(5.01));
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.8), "$0.80");
        assert_eq!(format_usd(12.346), "$12.35");
    }
}
