use crate::api::AdsError;
use crate::model::{PerformanceMetrics, ReportRow, columns};
use regex::Regex;

/// One row of the search-term report.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTerm {
    pub campaign_id: String,
    pub ad_group_id: Option<String>,
    /// Trimmed, lowercased, whitespace runs collapsed to one space
    pub query: String,
    pub metrics: PerformanceMetrics,
}

/// Normalizes customer queries so that casing and spacing variants compare equal.
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    whitespace: Regex,
}

impl QueryNormalizer {
    pub fn new() -> Result<Self, AdsError> {
        let whitespace =
            Regex::new(r"\s+").map_err(|e| AdsError::Config(format!("query pattern: {}", e)))?;
        Ok(Self { whitespace })
    }

    pub fn normalize(&self, text: &str) -> String {
        self.whitespace
            .replace_all(text.trim(), " ")
            .to_lowercase()
    }

    /// Parse a report row; rows without a query or campaign id are dropped.
    pub fn parse_row(&self, row: &ReportRow) -> Option<SearchTerm> {
        let query = self.normalize(row.get(columns::QUERY)?);
        if query.is_empty() {
            return None;
        }
        Some(SearchTerm {
            campaign_id: row.get(columns::CAMPAIGN_ID)?.to_string(),
            ad_group_id: row.get(columns::AD_GROUP_ID).map(str::to_string),
            query,
            metrics: PerformanceMetrics::from_row(row),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        let normalizer = QueryNormalizer::new().unwrap();
        assert_eq!(normalizer.normalize("  Organic   Potting\tSoil "), "organic potting soil");
    }

    #[test]
    fn test_parse_row_requires_query_and_campaign() {
        let normalizer = QueryNormalizer::new().unwrap();
        let row = ReportRow::from_pairs([
            ("campaignId", "1"),
            ("adGroupId", "2"),
            ("query", "Blue  Widget"),
            ("clicks", "6"),
        ]);
        let term = normalizer.parse_row(&row).unwrap();
        assert_eq!(term.query, "blue widget");
        assert_eq!(term.ad_group_id.as_deref(), Some("2"));
        assert_eq!(term.metrics.clicks, 6);

        assert!(normalizer
            .parse_row(&ReportRow::from_pairs([("campaignId", "1"), ("query", "  ")]))
            .is_none());
        assert!(normalizer
            .parse_row(&ReportRow::from_pairs([("query", "widget")]))
            .is_none());
    }
}
