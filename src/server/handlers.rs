//! HTTP request handlers for the conversion API.
//!
//! # Endpoints
//!
//! - `POST /api/convert` - Convert an uploaded image to WebP
//! - anything else - `404` JSON error

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use super::ingress::read_convert_form;
use crate::convert::{ConversionService, EncodedOutput, OUTPUT_CONTENT_TYPE};
use crate::error::{ConvertError, FieldError};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// The conversion service
    pub service: Arc<ConversionService>,

    /// Maximum accepted size of the uploaded image in bytes
    pub max_upload_size: usize,

    /// Deadline for reading the upload and converting it
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: ConversionService, max_upload_size: usize, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            max_upload_size,
            request_timeout,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON body for single-message errors: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// JSON body for field validation failures: `{"errors": [...]}`.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub errors: Vec<FieldError>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ConvertError to HTTP response.
///
/// Client errors keep their full message. Server errors are logged with
/// their cause and reduced to a generic message.
impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ConvertError::Validation(errors) => {
                debug!(
                    error_type = "validation",
                    status = 400,
                    fields = ?errors.iter().map(|e| e.field).collect::<Vec<_>>(),
                    "Client error: invalid form fields"
                );
                let body = ValidationErrorResponse {
                    errors: errors.clone(),
                };
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }

            ConvertError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "missing_file",
                "No image was provided".to_string(),
            ),

            ConvertError::InvalidFileType { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_file_type",
                "The uploaded file is not a valid image".to_string(),
            ),

            ConvertError::FileTooLarge { limit } => (
                StatusCode::BAD_REQUEST,
                "file_too_large",
                format!("File is too large. Maximum size is {}.", format_size(*limit)),
            ),

            ConvertError::UnexpectedField { field } => (
                StatusCode::BAD_REQUEST,
                "unexpected_field",
                format!("Unexpected field: {}", field),
            ),

            ConvertError::MalformedBody { message } => (
                StatusCode::BAD_REQUEST,
                "malformed_body",
                message.clone(),
            ),

            ConvertError::Timeout { .. } => (
                StatusCode::REQUEST_TIMEOUT,
                "timeout",
                "The request took too long to process".to_string(),
            ),

            ConvertError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Route not found".to_string(),
            ),

            ConvertError::Decode { .. } | ConvertError::Encode { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "conversion_error",
                "Error processing the image".to_string(),
            ),

            ConvertError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        };

        // Log errors based on severity
        if !self.is_client_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                cause = %self,
                "Server error: {}",
                message
            );
        } else if self.is_upload_rejection() {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                cause = %self,
                "Upload rejected: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found"
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                cause = %self,
                "Client error: {}",
                message
            );
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle conversion requests.
///
/// # Endpoint
///
/// `POST /api/convert`
///
/// # Form Fields (multipart/form-data)
///
/// - `image`: image file, must declare an `image/*` type, size-capped
/// - `filename`: non-empty target base name
/// - `quality`: integer 1-100
///
/// # Response
///
/// - `200 OK`: WebP body, `Content-Disposition: attachment; filename="<filename>.webp"`
/// - `400 Bad Request`: validation failure, missing/wrong/oversized file
/// - `408 Request Timeout`: upload and conversion exceeded the deadline
/// - `500 Internal Server Error`: conversion failure (details only in logs)
pub async fn convert_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ConvertError> {
    let output = tokio::time::timeout(state.request_timeout, convert_upload(&state, multipart))
        .await
        .map_err(|_| ConvertError::Timeout {
            seconds: state.request_timeout.as_secs(),
        })??;

    stream_output(output).await
}

/// Read, validate and convert the uploaded form.
async fn convert_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<EncodedOutput, ConvertError> {
    let form =
        read_convert_form(multipart, state.service.scratch(), state.max_upload_size).await?;
    let (image, request) = form.validate()?;
    state.service.convert(image, &request).await
}

/// Build a streaming response that deletes the output file once the body is
/// dropped, whether it was fully sent or not.
async fn stream_output(output: EncodedOutput) -> Result<Response, ConvertError> {
    let file = tokio::fs::File::open(&output.file).await?;
    let disposition = content_disposition(&output.filename);
    let size = output.size;
    let guard = output.file;

    let stream = ReaderStream::new(file).map(move |chunk| {
        if let Err(e) = &chunk {
            warn!(
                path = %guard.display(),
                error = %e,
                "Error sending converted file"
            );
        }
        chunk
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, OUTPUT_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| ConvertError::Io(std::io::Error::other(e)))?;

    Ok(response)
}

/// Build an `attachment` disposition for `filename`.
///
/// The quoted `filename` parameter is an ASCII fallback; the verbatim name
/// travels percent-encoded in `filename*`.
pub fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let value = if fallback == filename {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(filename)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Handle requests that match no route.
pub async fn not_found_handler() -> ConvertError {
    ConvertError::NotFound
}

// =============================================================================
// Tests
// =============================================================================
