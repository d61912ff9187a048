//! Asynchronous report protocol: create, poll, download and decode.

use crate::api::client::AdsApiClient;
use crate::api::types::{AdsError, ReportPollConfig};
use crate::model::{ReportRequest, ReportRow, ReportStatus, ReportTable};
use crate::model::report::ReportStatusBody;
use flate2::read::GzDecoder;
use futures::stream::{self, StreamExt};
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedReport {
    report_id: String,
}

impl AdsApiClient {
    /// Request generation of a report; returns the report id.
    pub async fn create_report(&self, request: &ReportRequest) -> Result<String, AdsError> {
        let path = format!("/v2/sp/{}/report", request.report_type.path_segment());
        let created: CreatedReport = self
            .request(Method::POST, &path, &[], Some(request.creation_body()))
            .await?;
        info!("Created report {} ({})", request.name, created.report_id);
        Ok(created.report_id)
    }

    pub async fn get_report_status(&self, report_id: &str) -> Result<ReportStatus, AdsError> {
        let body: ReportStatusBody = self
            .request(Method::GET, &format!("/v2/reports/{}", report_id), &[], None)
            .await?;
        Ok(body.into())
    }

    /// Poll until the report is ready and return its download location.
    ///
    /// Waits start at the configured interval and grow geometrically up to the cap.
    /// No single wait runs past the overall timeout, after which
    /// [`AdsError::ReportTimeout`] is returned. Failure and cancellation end the wait
    /// immediately. A status check that errors counts as still in progress unless the
    /// error is fatal.
    pub async fn wait_for_report(
        &self,
        report_id: &str,
        poll: &ReportPollConfig,
    ) -> Result<String, AdsError> {
        let started = Instant::now();
        let timeout = poll.timeout();
        let mut interval = poll.initial_interval();

        loop {
            let status = match self.get_report_status(report_id).await {
                Ok(status) => status,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Status check for report {} failed: {}", report_id, e);
                    ReportStatus::InProgress
                }
            };
            match status {
                ReportStatus::Success { location } => {
                    debug!(
                        "Report {} ready after {:.1}s",
                        report_id,
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(location);
                }
                ReportStatus::Failure { details } => {
                    return Err(AdsError::ReportFailed {
                        report_id: report_id.to_string(),
                        details: details.unwrap_or_else(|| "FAILURE".to_string()),
                    });
                }
                ReportStatus::Cancelled => {
                    return Err(AdsError::ReportFailed {
                        report_id: report_id.to_string(),
                        details: "CANCELLED".to_string(),
                    });
                }
                ReportStatus::InProgress => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(
                    "Report {} not ready after {:.1}s, giving up",
                    report_id,
                    elapsed.as_secs_f64()
                );
                return Err(AdsError::ReportTimeout {
                    report_id: report_id.to_string(),
                    waited_secs: elapsed.as_secs_f64(),
                });
            }

            let wait = interval.min(timeout - elapsed);
            debug!("Report {} in progress, next poll in {:?}", report_id, wait);
            tokio::time::sleep(wait).await;
            interval = poll.next_interval(interval);
        }
    }

    /// Fetch a report payload from its signed location. The location carries its own
    /// authorization, so no API headers are attached.
    pub async fn download_report(&self, location: &str) -> Result<ReportTable, AdsError> {
        let response = self.http.get(location).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                AdsError::Server {
                    status: status.as_u16(),
                    body,
                }
            } else {
                AdsError::Client {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let bytes = response.bytes().await?;
        let table = decode_report_payload(&bytes)?;
        debug!("Downloaded report with {} rows", table.len());
        Ok(table)
    }

    /// Create, wait for and download a single report.
    pub async fn fetch_report(&self, request: &ReportRequest) -> Result<ReportTable, AdsError> {
        let report_id = self.create_report(request).await?;
        let location = self.wait_for_report(&report_id, &self.reports.poll).await?;
        self.download_report(&location).await
    }

    /// Fetch several reports at once.
    ///
    /// Creation is sequential; waiting and downloading run concurrently with at most
    /// `max_workers` in flight. Reports that fail at any step are logged and left out
    /// of the result.
    pub async fn create_and_download_reports_parallel(
        &self,
        requests: &[ReportRequest],
        max_workers: usize,
    ) -> HashMap<String, ReportTable> {
        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            match self.create_report(request).await {
                Ok(report_id) => created.push((request.name.clone(), report_id)),
                Err(e) => warn!("Failed to create report {}: {}", request.name, e),
            }
        }

        let poll = &self.reports.poll;
        let results: Vec<(String, Result<ReportTable, AdsError>)> = stream::iter(created)
            .map(|(name, report_id)| async move {
                let table = match self.wait_for_report(&report_id, poll).await {
                    Ok(location) => self.download_report(&location).await,
                    Err(e) => Err(e),
                };
                (name, table)
            })
            .buffer_unordered(max_workers.max(1))
            .collect()
            .await;

        let mut tables = HashMap::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(table) => {
                    tables.insert(name, table);
                }
                Err(e) => warn!("Report {} unavailable: {}", name, e),
            }
        }

        info!(
            "Downloaded {} of {} reports",
            tables.len(),
            requests.len()
        );
        tables
    }
}

/// Decode a report payload: ZIP archive, then GZIP stream, then plain text. A
/// payload that fails to open in one format is tried in the next. The inner content
/// is CSV with a header row.
pub fn decode_report_payload(bytes: &[u8]) -> Result<ReportTable, AdsError> {
    if bytes.starts_with(&ZIP_MAGIC) {
        match unzip_first_entry(bytes) {
            Ok(text) => return parse_csv(&text),
            Err(e) => debug!("Report payload is not a readable archive: {}", e),
        }
    }

    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        match GzDecoder::new(bytes).read_to_string(&mut text) {
            Ok(_) => return parse_csv(&text),
            Err(e) => debug!("Report payload is not a readable gzip stream: {}", e),
        }
    }

    let text = String::from_utf8(bytes.to_vec())
        .map_err(|e| AdsError::Decode(format!("report is not UTF-8: {}", e)))?;
    parse_csv(&text)
}

fn unzip_first_entry(bytes: &[u8]) -> Result<String, AdsError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AdsError::Decode(format!("zip: {}", e)))?;
    if archive.len() == 0 {
        return Err(AdsError::Decode("zip archive is empty".to_string()));
    }
    let mut entry = archive
        .by_index(0)
        .map_err(|e| AdsError::Decode(format!("zip: {}", e)))?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| AdsError::Decode(format!("zip entry: {}", e)))?;
    Ok(text)
}

fn parse_csv(text: &str) -> Result<ReportTable, AdsError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Ok(ReportTable::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AdsError::Decode(format!("csv header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AdsError::Decode(format!("csv row: {}", e)))?;
        let cells = columns
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect::<HashMap<_, _>>();
        rows.push(ReportRow::new(cells));
    }

    Ok(ReportTable { columns, rows })
}
