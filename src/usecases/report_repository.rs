//! Report Repository - Validated CRUD over the Report Store
//!
//! Owns the report lifecycle:
//! - Creating reports from raw input (validate → default → insert)
//! - Lookup, filtered listing and pagination
//! - Confirmation and partial updates (stamping `confirmedAt`/`updatedAt`)
//! - Deletion (no soft-delete)
//!
//! Identifier syntax is checked before any store call, so a malformed
//! id surfaces as `InvalidIdentifier` and never reaches the driver.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::error::Result;
use crate::domain::validation;
use crate::domain::{
  ConfirmationStamp, ListOptions, NewReport, Report, ReportChanges, ReportError, ReportFilter,
  ReportId, ReportPatch, Violation,
};
use crate::ports::ReportStore;

/// CRUD and query operations over the report collection.
#[derive(Clone)]
pub struct ReportRepository {
  /// Injected store handle.
  store: Arc<dyn ReportStore>,
}

impl ReportRepository {
  /// Create a repository over the given store.
  pub fn new(store: Arc<dyn ReportStore>) -> Self {
    Self { store }
  }

  /// Validate raw input and insert it as a new report.
  ///
  /// # Errors
  /// `ValidationFailed` with every violated rule, or `Store`.
  #[instrument(skip(self, input))]
  pub async fn create(&self, input: &Value) -> Result<Report> {
    let report = validation::validate_new_report(input).map_err(ReportError::validation)?;
    self.insert(report).await
  }

  /// Insert an already-validated report, defaulting its timestamp to now.
  ///
  /// # Errors
  /// `Store` if the write fails. Writes are never retried.
  #[instrument(skip(self, report), fields(field_code = %report.field_code))]
  pub async fn insert(&self, mut report: NewReport) -> Result<Report> {
    report.timestamp.get_or_insert_with(Utc::now);
    let stored = self.store.insert(report).await?;
    info!(
      id = %stored.id,
      threat_level = %stored.threat_level,
      high_priority = stored.is_high_priority(),
      "Report created"
    );
    Ok(stored)
  }

  /// Fetch one report.
  ///
  /// # Errors
  /// `InvalidIdentifier`, `NotFound`, or `Store`.
  #[instrument(skip(self))]
  pub async fn get_by_id(&self, id: &str) -> Result<Report> {
    let id = ReportId::parse(id)?;
    self
      .store
      .find_by_id(&id)
      .await?
      .ok_or_else(|| ReportError::NotFound { id: id.to_string() })
  }

  /// Fetch one page of reports matching `filter`. The page size is
  /// clamped to the hard maximum.
  ///
  /// # Errors
  /// `Store` if the query fails.
  #[instrument(skip(self))]
  pub async fn list(&self, filter: &ReportFilter, options: ListOptions) -> Result<Vec<Report>> {
    let options = options.bounded();
    let reports = self.store.find(filter, &options).await?;
    debug!(count = reports.len(), "Reports listed");
    Ok(reports)
  }

  /// Reports with threat level >= 4, newest first.
  ///
  /// # Errors
  /// `Store` if the query fails.
  pub async fn list_high_threat(&self) -> Result<Vec<Report>> {
    self
      .list(&ReportFilter::high_priority(), ListOptions::default())
      .await
  }

  /// Reports submitted by one agent, newest first.
  ///
  /// # Errors
  /// `Store` if the query fails.
  pub async fn list_by_agent(&self, field_code: &str) -> Result<Vec<Report>> {
    self
      .list(&ReportFilter::by_agent(field_code.trim()), ListOptions::default())
      .await
  }

  /// Mark a report confirmed. Re-confirming refreshes `confirmedAt`.
  ///
  /// # Errors
  /// `InvalidIdentifier`, `NotFound`, or `Store`.
  #[instrument(skip(self))]
  pub async fn confirm(&self, id: &str) -> Result<Report> {
    let id = ReportId::parse(id)?;
    let now = Utc::now();
    let changes = ReportChanges {
      patch: ReportPatch {
        confirmed: Some(true),
        ..ReportPatch::default()
      },
      confirmed_at: ConfirmationStamp::Set(now),
      updated_at: now,
    };
    let report = self.apply(&id, &changes).await?;
    info!(id = %id, "Report confirmed");
    Ok(report)
  }

  /// Validate a raw partial update and apply it.
  ///
  /// # Errors
  /// `InvalidIdentifier` (checked first), `ValidationFailed`, `NotFound`,
  /// or `Store`.
  #[instrument(skip(self, input))]
  pub async fn update(&self, id: &str, input: &Value) -> Result<Report> {
    let id = ReportId::parse(id)?;
    let patch = validation::validate_patch(input).map_err(ReportError::validation)?;
    let report = self.update_fields(&id, patch).await?;
    info!(id = %id, "Report updated");
    Ok(report)
  }

  /// Apply an already-validated patch.
  ///
  /// A change of `confirmed` moves `confirmedAt` with it so a confirmed
  /// report always carries its confirmation time.
  ///
  /// # Errors
  /// `ValidationFailed` for an empty patch, `NotFound`, or `Store`.
  pub async fn update_fields(&self, id: &ReportId, patch: ReportPatch) -> Result<Report> {
    if patch.is_empty() {
      return Err(ReportError::validation(vec![Violation::new(
        "value",
        "\"value\" must have at least 1 key",
      )]));
    }
    let now = Utc::now();
    let confirmed_at = match patch.confirmed {
      Some(true) => ConfirmationStamp::Set(now),
      Some(false) => ConfirmationStamp::Clear,
      None => ConfirmationStamp::Keep,
    };
    let changes = ReportChanges {
      patch,
      confirmed_at,
      updated_at: now,
    };
    self.apply(id, &changes).await
  }

  /// Permanently remove a report.
  ///
  /// # Errors
  /// `InvalidIdentifier`, `NotFound` if nothing was deleted, or `Store`.
  #[instrument(skip(self))]
  pub async fn delete(&self, id: &str) -> Result<ReportId> {
    let id = ReportId::parse(id)?;
    if !self.store.delete(&id).await? {
      return Err(ReportError::NotFound { id: id.to_string() });
    }
    info!(id = %id, "Report deleted");
    Ok(id)
  }

  async fn apply(&self, id: &ReportId, changes: &ReportChanges) -> Result<Report> {
    self
      .store
      .update(id, changes)
      .await?
      .ok_or_else(|| ReportError::NotFound { id: id.to_string() })
  }
}
