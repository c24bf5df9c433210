use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use time::{Duration, OffsetDateTime};

use crate::core::config::Settings;
use crate::services::content_origin::ContentOriginReport;
use crate::services::report_parser::CriterionScore;

/// One grading request's derived results, scoped by `grading_id` so
/// concurrent requests can never observe each other's criteria.
#[derive(Debug, Clone)]
pub(crate) struct GradingRecord {
    pub(crate) grading_id: String,
    pub(crate) criteria: Vec<CriterionScore>,
    pub(crate) percentage_grades: Vec<f64>,
    pub(crate) letter_grades: Vec<String>,
    pub(crate) detection: Option<ContentOriginReport>,
    created_at: OffsetDateTime,
}

impl GradingRecord {
    pub(crate) fn new(
        grading_id: String,
        criteria: Vec<CriterionScore>,
        percentage_grades: Vec<f64>,
        letter_grades: Vec<String>,
        detection: Option<ContentOriginReport>,
    ) -> Self {
        Self {
            grading_id,
            criteria,
            percentage_grades,
            letter_grades,
            detection,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn is_expired(&self, now: OffsetDateTime, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Short-lived server-side cache for follow-up visualization and
/// content-origin lookups. Entries expire after the configured TTL and the
/// store holds at most `max_entries` records, oldest evicted first.
pub(crate) struct ResultStore {
    inner: Mutex<StoreInner>,
    ttl: Duration,
    max_entries: usize,
}

struct StoreInner {
    order: VecDeque<String>,
    records: HashMap<String, GradingRecord>,
}

impl ResultStore {
    pub(crate) fn new(ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner { order: VecDeque::new(), records: HashMap::new() }),
            ttl: Duration::seconds(ttl_seconds as i64),
            max_entries: max_entries.max(1),
        }
    }

    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.results().ttl_seconds, settings.results().max_entries)
    }

    pub(crate) fn insert(&self, record: GradingRecord) {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sweep(&mut inner, now, self.ttl);

        while inner.order.len() >= self.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.records.remove(&oldest);
            }
        }

        inner.order.push_back(record.grading_id.clone());
        inner.records.insert(record.grading_id.clone(), record);
    }

    pub(crate) fn get(&self, grading_id: &str) -> Option<GradingRecord> {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sweep(&mut inner, now, self.ttl);
        inner.records.get(grading_id).cloned()
    }

    /// Most recent non-expired record; preserves the original client
    /// protocol where follow-up calls carry no identifier.
    pub(crate) fn latest(&self) -> Option<GradingRecord> {
        let now = OffsetDateTime::now_utc();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        sweep(&mut inner, now, self.ttl);
        let last = inner.order.back().cloned()?;
        inner.records.get(&last).cloned()
    }
}

fn sweep(inner: &mut StoreInner, now: OffsetDateTime, ttl: Duration) {
    while let Some(front) = inner.order.front() {
        let expired = match inner.records.get(front) {
            Some(record) => record.is_expired(now, ttl),
            None => true,
        };
        if !expired {
            break;
        }
        if let Some(front) = inner.order.pop_front() {
            inner.records.remove(&front);
        }
    }
}
