//! HTTP Middleware - Request Id, Logging, Rate Limiting, Error Detail
//!
//! Requests flow through middleware in order:
//! 1. Security headers and CORS (tower-http layers)
//! 2. Request id generation (`X-Request-Id`)
//! 3. Request logging + Prometheus request metrics
//! 4. Per-IP rate limiting by tier
//! 5. Error detail logging / development-only detail exposure
//! 6. Handler execution

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{ApiError, ErrorDetail};
use super::AppState;
use crate::config::RateLimitConfig;

/// Largest error body rewritten to carry development detail.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Request id assigned by [`inject_request_id`].
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Rate-limit tier a request is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    /// GET and HEAD.
    Read,
    /// POST, PUT, PATCH, DELETE.
    Write,
    /// Everything else (OPTIONS, ...).
    General,
}

impl RateTier {
    pub fn for_method(method: &Method) -> Self {
        match *method {
            Method::GET | Method::HEAD => Self::Read,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE => Self::Write,
            _ => Self::General,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::General => "general",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Read => "Too many read requests from this IP",
            Self::Write => "Too many requests for this operation",
            Self::General => "Too many requests from this IP",
        }
    }
}

/// One keyed token bucket per tier, keyed by caller IP.
///
/// Each bucket holds `max` tokens and refills one token every
/// `window / max`, so a caller gets at most `max` requests per window
/// after an idle period.
pub struct RateLimiters {
    read: DefaultKeyedRateLimiter<IpAddr>,
    write: DefaultKeyedRateLimiter<IpAddr>,
    general: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
    window: Duration,
}

fn keyed_limiter(
    window: Duration,
    max: u32,
    clock: &DefaultClock,
) -> DefaultKeyedRateLimiter<IpAddr> {
    let burst = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(window / burst.get())
        .map_or_else(|| Quota::per_second(burst), |q| q.allow_burst(burst));
    RateLimiter::dashmap_with_clock(quota, clock)
}

impl RateLimiters {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_seconds);
        let clock = DefaultClock::default();
        Self {
            read: keyed_limiter(window, config.read_max, &clock),
            write: keyed_limiter(window, config.write_max, &clock),
            general: keyed_limiter(window, config.general_max, &clock),
            clock,
            window,
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    const fn limiter(&self, tier: RateTier) -> &DefaultKeyedRateLimiter<IpAddr> {
        match tier {
            RateTier::Read => &self.read,
            RateTier::Write => &self.write,
            RateTier::General => &self.general,
        }
    }

    /// Charge one request. On rejection returns how long until the next
    /// request would be admitted.
    pub fn check(&self, tier: RateTier, ip: IpAddr) -> Result<(), Duration> {
        let limiter = self.limiter(tier);
        limiter
            .check_key(&ip)
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Drop buckets for callers that have fully refilled.
    pub fn retain_recent(&self) {
        self.read.retain_recent();
        self.write.retain_recent();
        self.general.retain_recent();
    }
}

/// Caller IP from the connection, or loopback when served without
/// connect info (in-process tests).
pub fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ConnectInfo(addr)| addr.ip())
}

/// Assign a uuid v4 request id, visible to inner layers and echoed in
/// the `X-Request-Id` response header.
pub async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Log each request once on completion and record request metrics.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let ip = client_ip(&req);
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(req).await;

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    state
        .metrics
        .observe_request(method.as_str(), &route, status, elapsed);

    info!(
        method = %method,
        path = %path,
        ip = %ip,
        status,
        latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        request_id = %request_id,
        "Request completed"
    );

    response
}

/// Reject callers that exhausted their tier with 429 + `Retry-After`.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let tier = RateTier::for_method(req.method());
    let ip = client_ip(&req);

    if let Err(retry_after) = state.limiters.check(tier, ip) {
        state
            .metrics
            .rate_limited
            .with_label_values(&[tier.as_str()])
            .inc();
        warn!(ip = %ip, tier = tier.as_str(), path = %req.uri().path(), "Rate limit exceeded");
        return ApiError::RateLimited {
            tier,
            retry_after,
            window: state.limiters.window(),
        }
        .into_response();
    }

    next.run(req).await
}

/// Log failures that carry an [`ErrorDetail`] with request context, and
/// copy the detail into the body when the environment allows it.
pub async fn attach_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let ip = client_ip(&req);

    let response = next.run(req).await;

    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    if response.status().is_server_error() {
        error!(
            method = %method,
            path = %path,
            ip = %ip,
            timestamp = %Utc::now().to_rfc3339(),
            error = %detail,
            "Request failed"
        );
    }

    if !state.environment.exposes_error_detail() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_ERROR_BODY).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let Ok(mut payload) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if let Some(object) = payload.as_object_mut() {
        object.insert("detail".to_string(), Value::String(detail));
    }
    parts.headers.remove(header::CONTENT_LENGTH);
    let body = serde_json::to_vec(&payload).unwrap_or_else(|_| bytes.to_vec());
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_by_method() {
        assert_eq!(RateTier::for_method(&Method::GET), RateTier::Read);
        assert_eq!(RateTier::for_method(&Method::PATCH), RateTier::Write);
        assert_eq!(RateTier::for_method(&Method::DELETE), RateTier::Write);
        assert_eq!(RateTier::for_method(&Method::OPTIONS), RateTier::General);
    }

    #[test]
    fn test_limiter_rejects_after_budget_per_ip() {
        let limiters = RateLimiters::new(&RateLimitConfig {
            window_seconds: 900,
            read_max: 3,
            write_max: 2,
            general_max: 1,
        });
        let caller = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiters.check(RateTier::Write, caller).is_ok());
        assert!(limiters.check(RateTier::Write, caller).is_ok());
        let wait = limiters.check(RateTier::Write, caller).unwrap_err();
        assert!(wait > Duration::ZERO && wait <= Duration::from_secs(450));

        // Other callers and other tiers have their own buckets.
        assert!(limiters.check(RateTier::Write, other).is_ok());
        assert!(limiters.check(RateTier::Read, caller).is_ok());
    }
}
