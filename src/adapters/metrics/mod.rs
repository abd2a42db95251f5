//! Metrics Adapters
//!
//! Prometheus registry for HTTP traffic and report lifecycle counters,
//! rendered in text exposition format on `GET /metrics`.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
