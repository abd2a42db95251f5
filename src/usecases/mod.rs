//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain rules with the store port. Each use case is
//! constructed with an injected `Arc<dyn ReportStore>`.
//!
//! Use cases:
//! - `ReportRepository`: validated create, lookup, list, confirm, update, delete
//! - `StatisticsAggregator`: counts and grouped aggregates over the collection

pub mod report_repository;
pub mod statistics;

pub use report_repository::ReportRepository;
pub use statistics::StatisticsAggregator;
