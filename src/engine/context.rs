use crate::api::{AdsApi, AdsError};
use crate::audit::AuditLog;
use crate::model::{ReportRequest, ReportTable};
use chrono::{Days, NaiveDate};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

/// Reports fetched once for the whole run, keyed by request name.
#[derive(Debug, Clone, Default)]
pub struct Prefetched {
    tables: HashMap<String, ReportTable>,
    attempted: HashSet<String>,
}

impl Prefetched {
    pub fn new(requested: &[ReportRequest], tables: HashMap<String, ReportTable>) -> Self {
        Self {
            tables,
            attempted: requested.iter().map(|r| r.name.clone()).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ReportTable> {
        self.tables.get(name)
    }

    pub fn was_attempted(&self, name: &str) -> bool {
        self.attempted.contains(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Everything a stage borrows for one invocation.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub api: &'a dyn AdsApi,
    pub audit: &'a AuditLog,
    pub dry_run: bool,
    /// Calendar day the run is for; reports cover the days before it
    pub today: NaiveDate,
    pub prefetched: Option<&'a Prefetched>,
}

impl<'a> RunContext<'a> {
    pub fn new(api: &'a dyn AdsApi, audit: &'a AuditLog, dry_run: bool, today: NaiveDate) -> Self {
        Self {
            api,
            audit,
            dry_run,
            today,
            prefetched: None,
        }
    }

    pub fn with_prefetched(mut self, prefetched: &'a Prefetched) -> Self {
        self.prefetched = Some(prefetched);
        self
    }

    pub fn yesterday(&self) -> NaiveDate {
        days_before(self.today, 1)
    }

    /// Report table for `request`, served from the prefetch when it was part of it.
    /// A prefetched report that failed is not fetched again.
    pub async fn report(&self, request: ReportRequest) -> Result<Cow<'a, ReportTable>, AdsError> {
        if let Some(prefetched) = self.prefetched {
            if let Some(table) = prefetched.get(&request.name) {
                debug!("Using prefetched report {}", request.name);
                return Ok(Cow::Borrowed(table));
            }
            if prefetched.was_attempted(&request.name) {
                return Err(AdsError::ReportUnavailable(request.name));
            }
        }
        self.api.fetch_report(request).await.map(Cow::Owned)
    }
}

/// Entity listings inside a stage: fatal errors pass through, anything else is
/// logged and becomes `None` so the stage ends with an empty report.
pub(crate) fn listing<T>(result: Result<T, AdsError>, what: &str) -> Result<Option<T>, AdsError> {
    match result {
        Ok(items) => Ok(Some(items)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            error!("Failed to list {}: {}", what, e);
            Ok(None)
        }
    }
}

pub(crate) fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

pub(crate) fn elapsed_seconds(started: std::time::Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
