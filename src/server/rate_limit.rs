//! Per-client-IP request quota for the `/api` routes.
//!
//! Each client address gets a fixed window: the first request opens it, every
//! request inside it counts, and once `max_requests` is reached further
//! requests are rejected with `429` until the window ends.
//!
//! Windows are kept in an LRU map, so memory stays bounded no matter how many
//! distinct addresses show up; evicting an idle client only resets its quota.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::warn;

/// Default number of requests allowed per window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Default window length (15 minutes).
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Maximum number of client windows tracked at once.
const MAX_TRACKED_CLIENTS: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => panic!("capacity must be non-zero"),
};

/// Outcome of counting one request against a client's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request allowed; `remaining` requests are left in this window
    Allowed { remaining: u32 },

    /// Quota exhausted; the window resets after `retry_after`
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window rate limiter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<LruCache<IpAddr, Window>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(LruCache::new(MAX_TRACKED_CLIENTS))),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `client` made at `now`.
    pub async fn check_at(&self, client: IpAddr, now: Instant) -> RateLimitDecision {
        let mut windows = self.windows.lock().await;

        let entry = windows.get_or_insert_mut(client, || Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateLimitDecision::Allowed {
                remaining: self.max_requests - entry.count,
            }
        } else {
            let elapsed = now.saturating_duration_since(entry.started);
            RateLimitDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Count a request from `client` made now.
    pub async fn check(&self, client: IpAddr) -> RateLimitDecision {
        self.check_at(client, Instant::now()).await
    }

    /// Plain-text message sent with `429` responses.
    pub fn message(&self) -> String {
        format!(
            "Too many requests from this IP, please try again after {}",
            describe_window(self.window)
        )
    }
}

fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}

/// Client address of a request, or the unspecified address when the server
/// was not started with connect info (e.g. in-process tests).
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware.
///
/// Allowed responses carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`;
/// rejections are `429` with a plain-text body and `Retry-After`.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    match limiter.check(client).await {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            response
        }
        RateLimitDecision::Limited { retry_after } => {
            warn!(client = %client, "Rate limit exceeded");

            let retry_secs = retry_after.as_secs().max(1);
            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, limiter.message()).into_response();
            let headers = response.headers_mut();
            headers.insert("Retry-After", HeaderValue::from(retry_secs));
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
            response
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
