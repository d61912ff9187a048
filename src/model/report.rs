use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column identifiers requested at report creation and echoed in the header row.
pub mod columns {
    pub const CAMPAIGN_ID: &str = "campaignId";
    pub const AD_GROUP_ID: &str = "adGroupId";
    pub const KEYWORD_ID: &str = "keywordId";
    pub const QUERY: &str = "query";
    pub const IMPRESSIONS: &str = "impressions";
    pub const CLICKS: &str = "clicks";
    pub const COST: &str = "cost";
    pub const SALES: &str = "attributedSales14d";
    pub const ORDERS: &str = "attributedConversions14d";
}

/// Record type segment of the report creation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    Campaigns,
    AdGroups,
    Keywords,
    Targets,
}

impl ReportType {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ReportType::Campaigns => "campaigns",
            ReportType::AdGroups => "adGroups",
            ReportType::Keywords => "keywords",
            ReportType::Targets => "targets",
        }
    }
}

/// One report to create, wait for and download.
///
/// `name` identifies the report within a run; two requests with the same name are
/// the same report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportRequest {
    pub name: String,
    pub report_type: ReportType,
    pub metrics: Vec<String>,
    pub report_date: NaiveDate,
    pub segment: Option<String>,
}

const PERFORMANCE_METRICS: [&str; 5] = [
    columns::IMPRESSIONS,
    columns::CLICKS,
    columns::COST,
    columns::SALES,
    columns::ORDERS,
];

fn metric_list(ids: &[&str]) -> Vec<String> {
    ids.iter()
        .chain(PERFORMANCE_METRICS.iter())
        .map(|m| m.to_string())
        .collect()
}

impl ReportRequest {
    /// Keyword-level performance for a single day.
    pub fn keyword_performance(report_date: NaiveDate) -> Self {
        Self {
            name: format!("keyword_performance_{}", report_date.format("%Y%m%d")),
            report_type: ReportType::Keywords,
            metrics: metric_list(&[columns::CAMPAIGN_ID, columns::AD_GROUP_ID, columns::KEYWORD_ID]),
            report_date,
            segment: None,
        }
    }

    /// Campaign-level performance for a single day.
    pub fn campaign_performance(report_date: NaiveDate) -> Self {
        Self {
            name: format!("campaign_performance_{}", report_date.format("%Y%m%d")),
            report_type: ReportType::Campaigns,
            metrics: metric_list(&[columns::CAMPAIGN_ID]),
            report_date,
            segment: None,
        }
    }

    /// Customer search terms attributed to targets, segmented by query.
    pub fn search_terms(report_date: NaiveDate) -> Self {
        Self {
            name: format!("search_terms_{}", report_date.format("%Y%m%d")),
            report_type: ReportType::Targets,
            metrics: metric_list(&[columns::CAMPAIGN_ID, columns::AD_GROUP_ID, columns::QUERY]),
            report_date,
            segment: Some("query".to_string()),
        }
    }

    /// JSON body of the creation call.
    pub fn creation_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "reportDate": self.report_date.format("%Y%m%d").to_string(),
            "metrics": self.metrics.join(","),
        });
        if let Some(segment) = &self.segment {
            body["segment"] = serde_json::Value::String(segment.clone());
        }
        body
    }
}

/// Report generation state as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportStatus {
    InProgress,
    Success { location: String },
    Failure { details: Option<String> },
    Cancelled,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::InProgress)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportStatusBody {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status_details: Option<String>,
}

impl From<ReportStatusBody> for ReportStatus {
    fn from(body: ReportStatusBody) -> Self {
        match body.status.as_str() {
            "SUCCESS" => match body.location {
                Some(location) => ReportStatus::Success { location },
                None => ReportStatus::Failure {
                    details: Some("report succeeded without a download location".to_string()),
                },
            },
            "FAILURE" => ReportStatus::Failure {
                details: body.status_details,
            },
            "CANCELLED" => ReportStatus::Cancelled,
            _ => ReportStatus::InProgress,
        }
    }
}

/// One data row of a downloaded report, keyed by header column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow(HashMap<String, String>);

impl ReportRow {
    pub fn new(cells: HashMap<String, String>) -> Self {
        Self(cells)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Trimmed non-empty cell value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_u64(&self, column: &str) -> u64 {
        self.get(column)
            .and_then(|v| {
                v.parse::<u64>()
                    .ok()
                    .or_else(|| v.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
            })
            .unwrap_or(0)
    }

    pub fn get_f64(&self, column: &str) -> f64 {
        self.get(column)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Decoded tabular report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
