//! Prometheus Metrics Registry - Service Observability
//!
//! Registers and exposes Prometheus metrics for dashboards. Covers
//! request counts and latency per route, report lifecycle events, and
//! rate-limit rejections per tier.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Centralized Prometheus metrics for the service.
///
/// All metrics follow the naming convention `intel_*`. The registry is
/// owned by the instance, so tests can build as many as they like.
#[derive(Clone)]
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Requests served, by method, matched route and status.
    pub http_requests: IntCounterVec,
    /// Request latency in seconds, by method and matched route.
    pub http_duration: HistogramVec,
    /// Reports created.
    pub reports_created: IntCounter,
    /// Confirm operations that succeeded.
    pub reports_confirmed: IntCounter,
    /// Reports deleted.
    pub reports_deleted: IntCounter,
    /// Requests rejected by a rate-limit tier.
    pub rate_limited: IntCounterVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    ///
    /// # Errors
    /// Fails only if two metrics share a name.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("intel_http_requests_total", "Total HTTP requests served"),
            &["method", "route", "status"],
        )?;

        let http_duration = HistogramVec::new(
            HistogramOpts::new(
                "intel_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "route"],
        )?;

        let reports_created =
            IntCounter::new("intel_reports_created_total", "Total reports created")?;

        let reports_confirmed =
            IntCounter::new("intel_reports_confirmed_total", "Total report confirmations")?;

        let reports_deleted =
            IntCounter::new("intel_reports_deleted_total", "Total reports deleted")?;

        let rate_limited = IntCounterVec::new(
            Opts::new(
                "intel_rate_limited_total",
                "Requests rejected by the per-IP rate limiter",
            ),
            &["tier"],
        )?;

        // Register all metrics
        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_duration.clone()))?;
        registry.register(Box::new(reports_created.clone()))?;
        registry.register(Box::new(reports_confirmed.clone()))?;
        registry.register(Box::new(reports_deleted.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_duration,
            reports_created,
            reports_confirmed,
            reports_deleted,
            rate_limited,
        })
    }

    /// Record one completed request.
    pub fn observe_request(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        self.http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.http_duration
            .with_label_values(&[method, route])
            .observe(elapsed.as_secs_f64());
    }

    /// Render every registered metric in text exposition format.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
