//! HTTP Adapter - axum Router, Handlers and Middleware
//!
//! Maps verbs and paths onto `ReportRepository` and
//! `StatisticsAggregator` calls and shapes the JSON envelope. The layer
//! holds no business logic; all validation lives in the domain.
//!
//! | Method | Path                       | Handler            |
//! |--------|----------------------------|--------------------|
//! | POST   | /reports                   | `create_report`    |
//! | GET    | /reports                   | `list_reports`     |
//! | GET    | /reports/high              | `list_high_threat` |
//! | GET    | /reports/agent/:fieldCode  | `list_by_agent`    |
//! | GET    | /reports/:id               | `get_report`       |
//! | PATCH  | /reports/:id               | `update_report`    |
//! | DELETE | /reports/:id               | `delete_report`    |
//! | PUT    | /reports/:id/confirm       | `confirm_report`   |
//! | GET    | /stats, /health, /metrics, / | `system`         |

pub mod error;
pub mod middleware;
pub mod reports;
pub mod response;
pub mod server;
pub mod system;

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, put};
use axum::{middleware as axum_mw, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::warn;

pub use error::ApiError;
pub use middleware::RateLimiters;

use crate::adapters::metrics::MetricsRegistry;
use crate::config::{AppConfig, Environment};
use crate::ports::ReportStore;
use crate::usecases::{ReportRepository, StatisticsAggregator};

/// Shared state injected into every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub repository: ReportRepository,
    pub aggregator: Arc<StatisticsAggregator>,
    /// Direct store handle for health probes.
    pub store: Arc<dyn ReportStore>,
    pub metrics: Arc<MetricsRegistry>,
    pub limiters: Arc<RateLimiters>,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ReportStore>, config: &AppConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            repository: ReportRepository::new(Arc::clone(&store)),
            aggregator: Arc::new(StatisticsAggregator::new(Arc::clone(&store))),
            store,
            metrics,
            limiters: Arc::new(RateLimiters::new(&config.rate_limits)),
            environment: config.server.environment,
            allowed_origins: config.server.allowed_origins.clone(),
            started_at: Instant::now(),
        }
    }
}

/// CORS policy for the configured origins. A `*` entry allows any
/// origin, which browsers only accept without credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o.trim() == "*") {
        warn!("CORS allows any origin; credentials disabled");
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Build the router with all routes and the middleware stack.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(system::root))
        .route(
            "/reports",
            get(reports::list_reports).post(reports::create_report),
        )
        .route("/reports/high", get(reports::list_high_threat))
        .route("/reports/agent/:fieldCode", get(reports::list_by_agent))
        .route(
            "/reports/:id",
            get(reports::get_report)
                .patch(reports::update_report)
                .delete(reports::delete_report),
        )
        .route("/reports/:id/confirm", put(reports::confirm_report))
        .route("/stats", get(system::stats))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .fallback(system::not_found)
        .layer(axum_mw::from_fn_with_state(state.clone(), middleware::attach_error_detail))
        .layer(axum_mw::from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(axum_mw::from_fn_with_state(state.clone(), middleware::track_requests))
        .layer(axum_mw::from_fn(middleware::inject_request_id))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ))
        .layer(cors_layer(&state.allowed_origins))
        .with_state(state)
}
