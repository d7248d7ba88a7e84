//! # WebP Converter
//!
//! A single-purpose HTTP service that accepts an uploaded image, re-encodes it
//! as WebP at a requested quality and streams the result back as a download.
//!
//! Nothing is stored: the uploaded original and the encoded output live in
//! temporary files that are deleted as soon as each is no longer needed, on
//! success and on every error path.
//!
//! ## Architecture
//!
//! - [`server`] - Axum router, multipart ingress, handlers and middleware
//!   (security headers, CORS, per-IP rate limiting, tracing)
//! - [`convert`] - WebP codec, temporary-file guards and the conversion service
//! - [`config`] - CLI and environment configuration
//! - [`error`] - The error taxonomy shared by all layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use webp_converter::{create_router, ConversionService, RouterConfig, ScratchSpace};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let scratch = ScratchSpace::new("uploads", "output");
//!     scratch.ensure_dirs()?;
//!
//!     let router = create_router(ConversionService::new(scratch, 4), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use convert::{
    ConversionRequest, ConversionService, EncodedOutput, ScratchSpace, UploadedImage, WebpEncoder,
};
pub use error::{ConvertError, FieldError};
pub use server::{create_router, AppState, RateLimiter, RouterConfig};
