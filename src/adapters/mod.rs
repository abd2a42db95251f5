//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (MongoDB driver, axum HTTP server, Prometheus).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `http`: axum router, handlers, envelope and middleware
//! - `metrics`: Prometheus metrics registry
//! - `persistence`: MongoDB and in-memory report stores, startup retry
//! - `panic_hook`: log-and-exit handling for uncaught panics

pub mod http;
pub mod metrics;
pub mod panic_hook;
pub mod persistence;
