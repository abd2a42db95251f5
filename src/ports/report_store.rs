//! Report Store Port - Document Collection Interface
//!
//! The narrow set of collection-level primitives the use cases need from
//! a document store. Adapters (MongoDB, in-memory) implement this trait;
//! use cases only ever see `Arc<dyn ReportStore>`.
//!
//! Identifiers arrive already parsed as [`ReportId`], so an adapter
//! never receives malformed identifier syntax.

use async_trait::async_trait;

use crate::domain::{
  AgentActivity, ListOptions, NewReport, Report, ReportChanges, ReportFilter, ReportId,
  StoreError, ThreatLevelCount,
};

/// Result alias for store primitives.
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for report document stores.
///
/// Every method is independent and scoped to a single document or a
/// read-only query; no multi-document transactions are assumed.
#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
  /// Insert a new document and return it with its assigned identifier.
  ///
  /// `report.timestamp` is always resolved by the caller.
  async fn insert(&self, report: NewReport) -> StoreResult<Report>;

  /// Fetch a single report.
  async fn find_by_id(&self, id: &ReportId) -> StoreResult<Option<Report>>;

  /// Fetch one page of reports matching `filter`.
  async fn find(&self, filter: &ReportFilter, options: &ListOptions) -> StoreResult<Vec<Report>>;

  /// Apply `changes` atomically and return the updated report, or `None`
  /// if no document has this identifier.
  async fn update(&self, id: &ReportId, changes: &ReportChanges)
  -> StoreResult<Option<Report>>;

  /// Remove a document. Returns `true` if something was deleted.
  async fn delete(&self, id: &ReportId) -> StoreResult<bool>;

  /// Count documents matching `filter`.
  async fn count(&self, filter: &ReportFilter) -> StoreResult<u64>;

  /// Report counts grouped by threat level, ascending by level.
  async fn threat_level_distribution(&self) -> StoreResult<Vec<ThreatLevelCount>>;

  /// Up to `limit` agents by report count, descending, ties by field code.
  async fn top_agents(&self, limit: usize) -> StoreResult<Vec<AgentActivity>>;

  /// Cheap connectivity probe for health checks.
  async fn ping(&self) -> StoreResult<()>;

  /// Short backend name reported by health checks.
  fn backend_name(&self) -> &'static str;
}
