//! HTTP server layer for the conversion service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                     POST /api/convert                           │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │   ingress   │  │  handlers   │  │        routes           │  │
//! │  │ (multipart) │  │ (responses) │  │ (router + middleware)   │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! │         ┌──────────────┐  ┌────────────────────┐                │
//! │         │  rate_limit  │  │      security      │                │
//! │         └──────────────┘  └────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod ingress;
pub mod rate_limit;
pub mod routes;
pub mod security;

pub use handlers::{
    content_disposition, convert_handler, not_found_handler, AppState, ErrorResponse,
    ValidationErrorResponse,
};
pub use ingress::{
    is_image_content_type, parse_quality, read_convert_form, ConvertForm, FILENAME_FIELD,
    IMAGE_FIELD, QUALITY_FIELD,
};
pub use rate_limit::{rate_limit_middleware, RateLimitDecision, RateLimiter};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_REQUEST_TIMEOUT};
pub use security::security_headers_middleware;
