//! WebP encoder.
//!
//! This module decodes an uploaded image in any format the `image` crate is
//! built with and re-encodes it as lossy WebP at a requested quality.
//!
//! # Design Decisions
//!
//! - **Always decode/encode**: uploads are always decoded to pixels and
//!   re-encoded, even when the source is already WebP.
//!
//! - **No resizing**: output has exactly the pixel dimensions of the input.
//!   Quality is the only knob.
//!
//! - **Alpha preserved**: sources with an alpha channel are encoded from RGBA,
//!   everything else from RGB.

use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::{DynamicImage, ImageReader};

use crate::error::ConvertError;

/// Minimum allowed WebP quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed WebP quality.
pub const MAX_QUALITY: u8 = 100;

/// Extension appended to the target filename.
pub const OUTPUT_EXTENSION: &str = "webp";

/// Media type of the encoded output.
pub const OUTPUT_CONTENT_TYPE: &str = "image/webp";

// =============================================================================
// WebP Encoder
// =============================================================================

/// Stateless WebP encoder.
///
/// # Example
///
/// ```ignore
/// use webp_converter::convert::WebpEncoder;
///
/// let encoder = WebpEncoder::new();
/// let webp = encoder.encode(&png_bytes, 80)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct WebpEncoder {}

impl WebpEncoder {
    /// Create a new WebP encoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Decode `source` and re-encode it as WebP at `quality`.
    ///
    /// Quality is clamped to 1-100; callers validate it beforehand.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::Decode`] if the bytes are not a supported image
    /// - [`ConvertError::Encode`] if the codec rejects the decoded pixels,
    ///   e.g. a side longer than 16383 pixels
    pub fn encode(&self, source: &[u8], quality: u8) -> Result<Bytes, ConvertError> {
        let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
        let img = decode(source)?;

        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(ConvertError::Encode {
                message: format!("image has zero dimension ({}x{})", width, height),
            });
        }

        let encoded = if img.color().has_alpha() {
            let rgba = img.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height)
                .encode_simple(false, quality as f32)
        } else {
            let rgb = img.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height)
                .encode_simple(false, quality as f32)
        };

        let memory = encoded.map_err(|e| ConvertError::Encode {
            message: format!("{:?} ({}x{})", e, width, height),
        })?;

        if memory.is_empty() {
            return Err(ConvertError::Encode {
                message: "codec produced no output".to_string(),
            });
        }

        Ok(Bytes::copy_from_slice(&memory))
    }

    /// Read `input`, encode it and write the result to `output`.
    ///
    /// This is blocking; run it on the blocking pool.
    pub fn encode_file(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
    ) -> Result<u64, ConvertError> {
        let source = std::fs::read(input)?;
        let encoded = self.encode(&source, quality)?;
        std::fs::write(output, &encoded)?;
        Ok(encoded.len() as u64)
    }

    /// Get image dimensions without fully decoding.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), ConvertError> {
        ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| ConvertError::Decode {
                message: e.to_string(),
            })
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, ConvertError> {
    let reader = ImageReader::new(Cursor::new(source)).with_guessed_format()?;
    if reader.format().is_none() {
        return Err(ConvertError::Decode {
            message: "unrecognised image format".to_string(),
        });
    }
    reader.decode().map_err(|e| ConvertError::Decode {
        message: e.to_string(),
    })
}

/// Validate a quality value.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: i64) -> bool {
    (MIN_QUALITY as i64..=MAX_QUALITY as i64).contains(&quality)
}

// =============================================================================
// Tests
// =============================================================================
