//! In-Memory Report Store - Process-local Adapter for the Store Port
//!
//! Holds reports in a `tokio::sync::RwLock`-guarded map. Used by the test
//! suite and by the `memory` backend for local development. Identifiers
//! are generated in the same 24-hex syntax the MongoDB adapter produces.
//!
//! The store can be flipped unavailable to exercise degraded-health and
//! store-error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::stats::rank_agents;
use crate::domain::{
    AgentActivity, ListOptions, NewReport, Report, ReportChanges, ReportFilter, ReportId,
    SortField, SortOrder, StoreError, ThreatLevelCount,
};
use crate::ports::{ReportStore, StoreResult};

/// Map-backed implementation of [`ReportStore`].
#[derive(Debug)]
pub struct InMemoryReportStore {
    /// Reports keyed by identifier.
    reports: RwLock<HashMap<ReportId, Report>>,
    /// Simulated connectivity.
    available: AtomicBool,
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReportStore {
    /// Create an empty, available store.
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored reports.
    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    /// Whether the store holds no reports.
    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }

    fn guard(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }
}

fn compare(a: &Report, b: &Report, field: SortField) -> std::cmp::Ordering {
    let primary = match field {
        SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortField::ThreatLevel => a.threat_level.cmp(&b.threat_level),
        SortField::FieldCode => a.field_code.cmp(&b.field_code),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, report: NewReport) -> StoreResult<Report> {
        self.guard()?;
        let id = ReportId::parse(&ObjectId::new().to_hex())
            .map_err(|e| StoreError::Operation(e.to_string()))?;
        let stored = Report {
            id: id.clone(),
            field_code: report.field_code,
            location: report.location,
            threat_level: report.threat_level,
            description: report.description,
            timestamp: report.timestamp.unwrap_or_else(chrono::Utc::now),
            confirmed: false,
            confirmed_at: None,
            updated_at: None,
        };
        self.reports.write().await.insert(id, stored.clone());
        debug!(id = %stored.id, "Report stored in memory");
        Ok(stored)
    }

    async fn find_by_id(&self, id: &ReportId) -> StoreResult<Option<Report>> {
        self.guard()?;
        Ok(self.reports.read().await.get(id).cloned())
    }

    async fn find(&self, filter: &ReportFilter, options: &ListOptions) -> StoreResult<Vec<Report>> {
        self.guard()?;
        let guard = self.reports.read().await;
        let mut matching: Vec<Report> = guard
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(guard);

        matching.sort_by(|a, b| {
            let ord = compare(a, b, options.sort_field);
            match options.sort_order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });

        Ok(matching
            .into_iter()
            .skip(usize::try_from(options.skip).unwrap_or(usize::MAX))
            .take(options.limit as usize)
            .collect())
    }

    async fn update(
        &self,
        id: &ReportId,
        changes: &ReportChanges,
    ) -> StoreResult<Option<Report>> {
        self.guard()?;
        let mut guard = self.reports.write().await;
        Ok(guard.get_mut(id).map(|report| {
            changes.apply_to(report);
            report.clone()
        }))
    }

    async fn delete(&self, id: &ReportId) -> StoreResult<bool> {
        self.guard()?;
        Ok(self.reports.write().await.remove(id).is_some())
    }

    async fn count(&self, filter: &ReportFilter) -> StoreResult<u64> {
        self.guard()?;
        let guard = self.reports.read().await;
        Ok(guard.values().filter(|r| filter.matches(r)).count() as u64)
    }

    async fn threat_level_distribution(&self) -> StoreResult<Vec<ThreatLevelCount>> {
        self.guard()?;
        let guard = self.reports.read().await;
        let mut buckets: BTreeMap<u8, u64> = BTreeMap::new();
        for report in guard.values() {
            *buckets.entry(report.threat_level.value()).or_default() += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|(threat_level, count)| ThreatLevelCount {
                threat_level,
                count,
            })
            .collect())
    }

    async fn top_agents(&self, limit: usize) -> StoreResult<Vec<AgentActivity>> {
        self.guard()?;
        let guard = self.reports.read().await;
        let mut agents: HashMap<&str, AgentActivity> = HashMap::new();
        for report in guard.values() {
            let entry = agents
                .entry(report.field_code.as_str())
                .or_insert_with(|| AgentActivity {
                    field_code: report.field_code.clone(),
                    report_count: 0,
                    high_threat_count: 0,
                });
            entry.report_count += 1;
            if report.is_high_priority() {
                entry.high_threat_count += 1;
            }
        }
        Ok(rank_agents(agents.into_values().collect(), limit))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.guard()
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
