//! Conversion service.
//!
//! The service ties the codec to the temporary-file lifecycle:
//!
//! 1. Wait for a conversion permit (bounds concurrent CPU-heavy work)
//! 2. Run the codec on the blocking pool, input file -> output file
//! 3. Delete the input as soon as the codec returns, success or not
//! 4. Hand the output back inside a guard that deletes it once dropped
//!
//! The blocking closure owns both files and the permit, so if the caller gives
//! up (timeout, client disconnect) the permit stays taken until the codec
//! finishes, and the files are removed right after.

use std::sync::Arc;

use tempfile::TempPath;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::encoder::{WebpEncoder, OUTPUT_EXTENSION};
use super::temp::ScratchSpace;
use crate::error::ConvertError;

// =============================================================================
// Request / Response Types
// =============================================================================

/// An uploaded image that has been written to temporary storage.
#[derive(Debug)]
pub struct UploadedImage {
    /// Temporary input file, deleted when dropped
    pub file: TempPath,

    /// Media type declared by the client (always `image/*`)
    pub content_type: String,

    /// Filename supplied by the client, if any
    pub original_name: String,

    /// Size of the stored upload in bytes
    pub size: u64,
}

/// The validated text fields accompanying an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Target base filename, used verbatim for the download name
    pub filename: String,

    /// WebP quality (1-100)
    pub quality: u8,
}

impl ConversionRequest {
    pub fn new(filename: impl Into<String>, quality: u8) -> Self {
        Self {
            filename: filename.into(),
            quality,
        }
    }

    /// Name offered to the client: `<filename>.webp`.
    pub fn output_filename(&self) -> String {
        format!("{}.{}", self.filename, OUTPUT_EXTENSION)
    }
}

/// A successfully encoded image waiting to be streamed to the client.
#[derive(Debug)]
pub struct EncodedOutput {
    /// Temporary output file, deleted when dropped
    pub file: TempPath,

    /// Name offered to the client in `Content-Disposition`
    pub filename: String,

    /// Size of the encoded file in bytes
    pub size: u64,
}

// =============================================================================
// Conversion Service
// =============================================================================

/// Converts uploaded images to WebP.
pub struct ConversionService {
    encoder: WebpEncoder,
    scratch: ScratchSpace,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ConversionService {
    /// Create a service allowing `max_concurrent` simultaneous conversions.
    pub fn new(scratch: ScratchSpace, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            encoder: WebpEncoder::new(),
            scratch,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of conversions that could start right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Convert `image` according to `request`.
    ///
    /// The input file is always deleted before this returns. On success the
    /// returned [`EncodedOutput`] owns the output file.
    pub async fn convert(
        &self,
        image: UploadedImage,
        request: &ConversionRequest,
    ) -> Result<EncodedOutput, ConvertError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ConvertError::Encode {
                message: format!("conversion pool closed: {}", e),
            })?;

        let encoder = self.encoder.clone();
        let output = self
            .scratch
            .create_output(&request.filename, OUTPUT_EXTENSION)?;
        let quality = request.quality;
        let input = image.file;

        debug!(
            input = %input.display(),
            output = %output.display(),
            quality,
            size = image.size,
            "Starting conversion"
        );

        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let encoded = encoder.encode_file(&input, &output, quality);

            // Input is consumed exactly once; drop it before reporting
            if let Err(e) = input.close() {
                error!(error = %e, "Failed to remove uploaded file");
            }

            encoded.map(|size| (output, size))
        })
        .await
        .map_err(|e| ConvertError::Encode {
            message: format!("conversion task failed: {}", e),
        })?;

        let (file, size) = result?;

        info!(
            filename = %request.output_filename(),
            input_size = image.size,
            output_size = size,
            quality,
            "Converted image"
        );

        Ok(EncodedOutput {
            file,
            filename: request.output_filename(),
            size,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
