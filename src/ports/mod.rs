//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ReportStore`: document collection holding intelligence reports

pub mod report_store;

pub use report_store::{ReportStore, StoreResult};
