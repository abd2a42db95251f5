//! Domain layer - Report model, validation rules and statistics types.
//!
//! Pure types and rules with no I/O (hexagonal architecture inner ring).
//! Everything here is serializable and testable in isolation.

pub mod error;
pub mod report;
pub mod stats;
pub mod validation;

// Re-export core types for convenience
pub use error::{ReportError, StoreError, Violation};
pub use report::{
    ConfirmationStamp, ListOptions, NewReport, Report, ReportChanges, ReportFilter, ReportId,
    ReportPatch, SortField, SortOrder, ThreatLevel,
};
pub use stats::{AgentActivity, StatsOverview, StatsSnapshot, ThreatLevelCount};
