//! Sanity checks on computed bids. Findings are reported, never enforced.

use crate::model::{BidLimits, format_usd, to_cents};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub message: String,
}

impl VerificationResult {
    pub fn is_passed(&self) -> bool {
        self.status == VerificationStatus::Passed
    }
}

/// Check a bid change against the bid limits and the maximum relative swing.
pub fn verify_bid_change(
    old_bid: f64,
    new_bid: f64,
    limits: &BidLimits,
    max_change_pct: f64,
) -> VerificationResult {
    if !limits.contains(new_bid) {
        return VerificationResult {
            status: VerificationStatus::Failed,
            message: format!(
                "bid {} outside [{}, {}]",
                format_usd(new_bid),
                format_usd(limits.min_bid),
                format_usd(limits.max_bid)
            ),
        };
    }

    if old_bid > 0.0 {
        let change = (to_cents(new_bid) - to_cents(old_bid)).abs() as f64 / (old_bid * 100.0);
        if change > max_change_pct + f64::EPSILON {
            return VerificationResult {
                status: VerificationStatus::Warning,
                message: format!(
                    "bid change {} -> {} is {:.1}%, above the {:.1}% limit",
                    format_usd(old_bid),
                    format_usd(new_bid),
                    change * 100.0,
                    max_change_pct * 100.0
                ),
            };
        }
    }

    VerificationResult {
        status: VerificationStatus::Passed,
        message: String::new(),
    }
}
