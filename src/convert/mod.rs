//! Image conversion layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ UploadedImage + ConversionRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ConversionService             │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ ScratchSpace │  │   WebpEncoder   │  │
//! │  │ + TempPath   │  │  (decode →      │  │
//! │  │   guards     │  │   encode)       │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │ EncodedOutput
//!                      ▼
//!             streamed to the client,
//!             deleted once the body drops
//! ```
//!
//! # Components
//!
//! - [`ConversionService`]: runs one conversion with bounded concurrency
//! - [`WebpEncoder`]: decodes any supported image and encodes WebP
//! - [`ScratchSpace`]: upload and output directories, unique temp file minting

mod encoder;
mod service;
mod temp;

pub use encoder::{
    is_valid_quality, WebpEncoder, MAX_QUALITY, MIN_QUALITY, OUTPUT_CONTENT_TYPE,
    OUTPUT_EXTENSION,
};
pub use service::{ConversionRequest, ConversionService, EncodedOutput, UploadedImage};
pub use temp::{sanitize_component, ScratchSpace};
