use crate::model::report::{ReportRow, columns};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Performance over a lookback window. All counters are non-negative; ratios are
/// computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub impressions: u64,
    pub clicks: u64,
    pub cost: f64,
    pub sales: f64,
    pub orders: u64,
}

impl PerformanceMetrics {
    /// Build metrics from a report row using the 14-day attribution columns.
    /// Missing or malformed cells count as zero.
    pub fn from_row(row: &ReportRow) -> Self {
        Self {
            impressions: row.get_u64(columns::IMPRESSIONS),
            clicks: row.get_u64(columns::CLICKS),
            cost: row.get_f64(columns::COST).max(0.0),
            sales: row.get_f64(columns::SALES).max(0.0),
            orders: row.get_u64(columns::ORDERS),
        }
    }

    pub fn has_sales(&self) -> bool {
        self.sales > 0.0
    }

    /// Cost over attributed sales; `f64::INFINITY` when there are no sales.
    pub fn acos(&self) -> f64 {
        acos(self.cost, self.sales)
    }

    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        }
    }

    pub fn roas(&self) -> f64 {
        if self.cost > 0.0 {
            self.sales / self.cost
        } else {
            0.0
        }
    }

    pub fn cpc(&self) -> f64 {
        if self.clicks > 0 {
            self.cost / self.clicks as f64
        } else {
            0.0
        }
    }
}

impl AddAssign for PerformanceMetrics {
    fn add_assign(&mut self, other: Self) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.cost += other.cost;
        self.sales += other.sales;
        self.orders += other.orders;
    }
}

pub fn acos(cost: f64, sales: f64) -> f64 {
    if sales > 0.0 {
        cost / sales
    } else {
        f64::INFINITY
    }
}

/// Render a ratio as a percentage with one decimal, e.g. `0.253 -> "25.3%"`.
pub fn format_ratio(ratio: f64) -> String {
    if ratio.is_finite() {
        format!("{:.1}%", ratio * 100.0)
    } else {
        "n/a (no sales)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acos_without_sales_is_infinite() {
        let metrics = PerformanceMetrics {
            clicks: 30,
            cost: 20.0,
            ..Default::default()
        };
        assert!(metrics.acos().is_infinite());
        assert_eq!(metrics.roas(), 0.0);

        let idle = PerformanceMetrics::default();
        assert!(idle.acos().is_infinite());
        assert_eq!(idle.cpc(), 0.0);
        assert_eq!(idle.ctr(), 0.0);
    }

    #[test]
    fn test_ratios() {
        let metrics = PerformanceMetrics {
            impressions: 1000,
            clicks: 50,
            cost: 50.0,
            sales: 200.0,
            orders: 8,
        };
        assert_eq!(metrics.acos(), 0.25);
        assert_eq!(metrics.roas(), 4.0);
        assert_eq!(metrics.cpc(), 1.0);
        assert_eq!(metrics.ctr(), 0.05);
    }

    #[test]
    fn test_from_row_treats_blank_cells_as_zero() {
        let row = ReportRow::from_pairs([
            ("clicks", "12"),
            ("cost", "3.50"),
            ("attributedSales14d", ""),
            ("impressions", "not-a-number"),
        ]);
        let metrics = PerformanceMetrics::from_row(&row);
        assert_eq!(metrics.clicks, 12);
        assert_eq!(metrics.cost, 3.5);
        assert_eq!(metrics.sales, 0.0);
        assert_eq!(metrics.impressions, 0);
    }

    #[test]
    fn test_accumulate() {
        let mut total = PerformanceMetrics::default();
        total += PerformanceMetrics {
            clicks: 10,
            cost: 4.0,
            ..Default::default()
        };
        total += PerformanceMetrics {
            clicks: 5,
            cost: 1.0,
            sales: 10.0,
            ..Default::default()
        };
        assert_eq!(total.clicks, 15);
        assert_eq!(total.acos(), 0.5);
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(0.253), "25.3%");
        assert_eq!(format_ratio(f64::INFINITY), "n/a (no sales)");
    }
}
