//! Persistence Adapters - Report Storage Backends
//!
//! Implements the `ReportStore` port twice:
//! - `mongo`: MongoDB collection with a pooled client (production)
//! - `memory`: process-local map for tests and `STORE_BACKEND=memory`
//!
//! `retry` holds the backoff policy used while establishing the
//! startup connection.

pub mod memory;
pub mod mongo;
pub mod retry;

pub use memory::InMemoryReportStore;
pub use mongo::{MongoReportStore, MongoSettings};
pub use retry::{RetryPolicy, StartupError};
