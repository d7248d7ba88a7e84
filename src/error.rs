use serde::Serialize;
use thiserror::Error;

/// A single problem with one of the text fields of a conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending form field (`filename` or `quality`)
    pub field: &'static str,

    /// Human-readable description of the problem
    pub message: String,

    /// The value the client sent, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>, value: Option<String>) -> Self {
        Self {
            field,
            message: message.into(),
            value,
        }
    }
}

/// Errors that can occur while accepting, converting or returning an image.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// One or more text fields failed validation (all problems are collected)
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The request did not contain an `image` part
    #[error("No image was provided")]
    MissingFile,

    /// The uploaded part does not declare an image media type
    #[error("The uploaded file is not a valid image (declared type: {content_type})")]
    InvalidFileType { content_type: String },

    /// The uploaded file exceeds the configured size cap
    #[error("File is too large. Maximum size is {limit} bytes")]
    FileTooLarge { limit: usize },

    /// A file part arrived under a name other than `image`, or twice
    #[error("Unexpected field: {field}")]
    UnexpectedField { field: String },

    /// The multipart body could not be parsed
    #[error("Malformed multipart body: {message}")]
    MalformedBody { message: String },

    /// The codec could not decode the uploaded bytes
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// The codec could not produce the output image
    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    /// Filesystem failure while handling temporaries
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload and conversion did not finish within the request deadline
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// No route matched the request
    #[error("Route not found")]
    NotFound,
}

impl ConvertError {
    /// Whether this error was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ConvertError::Validation(_)
                | ConvertError::MissingFile
                | ConvertError::InvalidFileType { .. }
                | ConvertError::FileTooLarge { .. }
                | ConvertError::UnexpectedField { .. }
                | ConvertError::MalformedBody { .. }
                | ConvertError::Timeout { .. }
                | ConvertError::NotFound
        )
    }

    /// Whether this error is an upload rejection (wrong media type or oversized).
    pub fn is_upload_rejection(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidFileType { .. } | ConvertError::FileTooLarge { .. }
        )
    }
}
