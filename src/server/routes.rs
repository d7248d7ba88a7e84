//! Router configuration for the conversion service.
//!
//! # Route Structure
//!
//! ```text
//! POST /api/convert    - Convert an uploaded image to WebP (rate limited)
//! *                    - 404 JSON error (`/api/*` still counts against the quota)
//! ```
//!
//! # Middleware
//!
//! Outermost first: request tracing, security headers, CORS, and on `/api`
//! the per-IP rate limiter. Body size is capped at the upload limit plus a
//! small allowance for the rest of the multipart form.
//!
//! # Example
//!
//! ```ignore
//! use webp_converter::convert::{ConversionService, ScratchSpace};
//! use webp_converter::server::routes::{create_router, RouterConfig};
//!
//! let service = ConversionService::new(ScratchSpace::new("uploads", "output"), 4);
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{extract::DefaultBodyLimit, middleware, routing::post, Router};
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{convert_handler, not_found_handler, AppState};
use super::rate_limit::{
    rate_limit_middleware, RateLimiter, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW,
};
use super::security::security_headers_middleware;
use crate::convert::ConversionService;

/// Default cap on the uploaded image size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Default deadline for upload + conversion.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Room for the text fields and multipart framing on top of the image.
const FORM_OVERHEAD: usize = 64 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum accepted size of the uploaded image in bytes
    pub max_upload_size: usize,

    /// Requests allowed per client IP per window on `/api`
    pub rate_limit_max: u32,

    /// Length of the rate limit window
    pub rate_limit_window: Duration,

    /// Deadline for upload + conversion
    pub request_timeout: Duration,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration with the service defaults:
    /// any CORS origin, 10 MiB uploads, 100 requests per 15 minutes,
    /// 120 s timeout, tracing enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.rate_limit_max = max_requests;
        self.rate_limit_window = window;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router(service: ConversionService, config: RouterConfig) -> Router {
    let state = AppState::new(service, config.max_upload_size, config.request_timeout);
    let limiter = RateLimiter::new(config.rate_limit_max, config.rate_limit_window);

    let api_routes = Router::new()
        .route(
            "/convert",
            post(convert_handler).fallback(not_found_handler),
        )
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(
            config.max_upload_size.saturating_add(FORM_OVERHEAD),
        ))
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .with_state(state);

    let router = Router::new()
        .nest("/api", api_routes)
        .fallback(not_found_handler)
        .layer(build_cors_layer(&config))
        .layer(middleware::from_fn(security_headers_middleware));

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
