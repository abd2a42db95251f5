//! Core report domain types.
//!
//! Defines the intelligence report entity, its identifier and threat
//! level value types, and the payloads that flow into the store
//! (creation drafts, partial updates, filters, pagination).
//!
//! Optional fields are explicit: `confirmed_at` is present only once a
//! report has been confirmed, `updated_at` only after a mutating update.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ReportError;

/// Threat levels at or above this value are classified high-priority.
pub const HIGH_PRIORITY_THRESHOLD: u8 = 4;

/// Default page size for list queries.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Hard upper bound on a single page of results.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Length of a store identifier in hex characters (12 bytes).
const REPORT_ID_HEX_LEN: usize = 24;

// ────────────────────────────────────────────
// Value types
// ────────────────────────────────────────────

/// Opaque report identifier in the store's native syntax.
///
/// Always 24 lowercase hex characters. Construction goes through
/// [`ReportId::parse`], so a malformed identifier can never reach a
/// store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Parse and normalize a raw identifier.
    ///
    /// # Errors
    /// Returns [`ReportError::InvalidIdentifier`] if the input is not
    /// exactly 24 hex characters.
    pub fn parse(raw: &str) -> Result<Self, ReportError> {
        let trimmed = raw.trim();
        if trimmed.len() == REPORT_ID_HEX_LEN && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(ReportError::InvalidIdentifier {
                value: raw.to_string(),
            })
        }
    }

    /// Borrow the hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Threat level on the closed scale 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ThreatLevel(u8);

impl ThreatLevel {
    /// Lowest valid level.
    pub const MIN: u8 = 1;
    /// Highest valid level.
    pub const MAX: u8 = 5;

    /// Build a threat level, returning `None` when out of range.
    pub fn new(level: i64) -> Option<Self> {
        u8::try_from(level)
            .ok()
            .filter(|l| (Self::MIN..=Self::MAX).contains(l))
            .map(Self)
    }

    /// Numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether this level counts as high-priority.
    pub const fn is_high_priority(self) -> bool {
        self.0 >= HIGH_PRIORITY_THRESHOLD
    }
}

impl TryFrom<i64> for ThreatLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("threat level {value} outside 1..=5"))
    }
}

impl From<ThreatLevel> for u8 {
    fn from(level: ThreatLevel) -> Self {
        level.0
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ────────────────────────────────────────────
// Entity
// ────────────────────────────────────────────

/// A stored intelligence report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Store-assigned identifier, never reassigned.
    pub id: ReportId,
    /// Submitting agent's field code.
    pub field_code: String,
    /// Where the observation was made.
    pub location: String,
    /// Assessed threat level.
    pub threat_level: ThreatLevel,
    /// Free-text account of the observation.
    pub description: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Whether the report has been verified.
    pub confirmed: bool,
    /// Set when `confirmed` last transitioned to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set on any mutating update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Whether this report is high-priority (threat level >= 4).
    pub const fn is_high_priority(&self) -> bool {
        self.threat_level.is_high_priority()
    }
}

/// Normalized creation payload produced by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub field_code: String,
    pub location: String,
    pub threat_level: ThreatLevel,
    pub description: String,
    /// Creation time; the repository fills in "now" when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Validated partial update. At least one field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPatch {
    pub field_code: Option<String>,
    pub location: Option<String>,
    pub threat_level: Option<ThreatLevel>,
    pub description: Option<String>,
    pub confirmed: Option<bool>,
}

impl ReportPatch {
    /// True when no field is set.
    pub const fn is_empty(&self) -> bool {
        self.field_code.is_none()
            && self.location.is_none()
            && self.threat_level.is_none()
            && self.description.is_none()
            && self.confirmed.is_none()
    }
}

/// What happens to `confirmed_at` as part of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmationStamp {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Stamp a new confirmation time.
    Set(DateTime<Utc>),
    /// Remove the confirmation time (report un-confirmed).
    Clear,
}

/// Fully resolved set of changes handed to the store in one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportChanges {
    pub patch: ReportPatch,
    pub confirmed_at: ConfirmationStamp,
    pub updated_at: DateTime<Utc>,
}

impl ReportChanges {
    /// Apply these changes to an in-memory report.
    pub fn apply_to(&self, report: &mut Report) {
        if let Some(code) = &self.patch.field_code {
            report.field_code.clone_from(code);
        }
        if let Some(location) = &self.patch.location {
            report.location.clone_from(location);
        }
        if let Some(level) = self.patch.threat_level {
            report.threat_level = level;
        }
        if let Some(description) = &self.patch.description {
            report.description.clone_from(description);
        }
        if let Some(confirmed) = self.patch.confirmed {
            report.confirmed = confirmed;
        }
        match self.confirmed_at {
            ConfirmationStamp::Keep => {}
            ConfirmationStamp::Set(at) => report.confirmed_at = Some(at),
            ConfirmationStamp::Clear => report.confirmed_at = None,
        }
        report.updated_at = Some(self.updated_at);
    }
}

// ────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────

/// Conjunctive filter over the report collection. Empty matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub field_code: Option<String>,
    pub threat_level: Option<ThreatLevel>,
    pub min_threat_level: Option<ThreatLevel>,
    pub confirmed: Option<bool>,
}

impl ReportFilter {
    /// Filter matching every report.
    pub fn all() -> Self {
        Self::default()
    }

    /// Reports at or above the high-priority threshold.
    pub fn high_priority() -> Self {
        Self {
            min_threat_level: ThreatLevel::new(i64::from(HIGH_PRIORITY_THRESHOLD)),
            ..Self::default()
        }
    }

    /// Reports submitted by one agent.
    pub fn by_agent(field_code: impl Into<String>) -> Self {
        Self {
            field_code: Some(field_code.into()),
            ..Self::default()
        }
    }

    /// Reports with the given confirmation state.
    pub fn confirmed(confirmed: bool) -> Self {
        Self {
            confirmed: Some(confirmed),
            ..Self::default()
        }
    }

    /// Evaluate the filter against a report.
    pub fn matches(&self, report: &Report) -> bool {
        self.field_code
            .as_ref()
            .is_none_or(|code| *code == report.field_code)
            && self.threat_level.is_none_or(|level| level == report.threat_level)
            && self
                .min_threat_level
                .is_none_or(|min| report.threat_level >= min)
            && self.confirmed.is_none_or(|c| c == report.confirmed)
    }
}

/// Sortable report attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Timestamp,
    ThreatLevel,
    FieldCode,
}

impl SortField {
    /// Stored attribute name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::ThreatLevel => "threatLevel",
            Self::FieldCode => "fieldCode",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Pagination and ordering for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: u32,
    pub skip: u64,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            skip: 0,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl ListOptions {
    /// Clamp the page size into `1..=MAX_LIST_LIMIT`.
    #[must_use]
    pub fn bounded(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_LIST_LIMIT);
        self
    }
}
