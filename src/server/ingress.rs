//! Multipart ingress for the conversion endpoint.
//!
//! Reading happens in two steps, mirroring how the form is checked:
//!
//! 1. [`read_convert_form`] streams the body. The `image` part is rejected
//!    immediately if it does not declare an `image/*` type or grows past the
//!    size cap; otherwise it is written to a fresh temporary file.
//! 2. [`ConvertForm::validate`] checks the text fields, collecting every
//!    problem, and only then checks that an image was sent.
//!
//! Any error returned from either step drops the form, and with it the guard
//! on the uploaded file, so nothing is left behind in the upload directory.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use http::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::convert::{
    is_valid_quality, ConversionRequest, ScratchSpace, UploadedImage,
};
use crate::error::{ConvertError, FieldError};

/// Form field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// Form field carrying the target base filename.
pub const FILENAME_FIELD: &str = "filename";

/// Form field carrying the quality value.
pub const QUALITY_FIELD: &str = "quality";

/// The raw, not yet validated contents of a conversion form.
#[derive(Debug, Default)]
pub struct ConvertForm {
    pub image: Option<UploadedImage>,
    pub filename: Option<String>,
    pub quality: Option<String>,
}

impl ConvertForm {
    /// Validate the text fields, then the presence of the image.
    ///
    /// Field problems are all reported together and take precedence over a
    /// missing image.
    pub fn validate(self) -> Result<(UploadedImage, ConversionRequest), ConvertError> {
        let mut errors = Vec::new();

        let filename = match self.filename {
            Some(filename) if !filename.is_empty() => Some(filename),
            other => {
                errors.push(FieldError::new(
                    FILENAME_FIELD,
                    "Filename is required",
                    other,
                ));
                None
            }
        };

        let quality = match parse_quality(self.quality.as_deref()) {
            Some(quality) => Some(quality),
            None => {
                errors.push(FieldError::new(
                    QUALITY_FIELD,
                    "Quality must be an integer between 1 and 100",
                    self.quality,
                ));
                None
            }
        };

        match (filename, quality) {
            (Some(filename), Some(quality)) => {
                let image = self.image.ok_or(ConvertError::MissingFile)?;
                Ok((image, ConversionRequest::new(filename, quality)))
            }
            _ => Err(ConvertError::Validation(errors)),
        }
    }
}

/// Parse a quality value: an integer in 1-100, nothing else.
pub fn parse_quality(value: Option<&str>) -> Option<u8> {
    let quality = value?.parse::<i64>().ok()?;
    if is_valid_quality(quality) {
        u8::try_from(quality).ok()
    } else {
        None
    }
}

/// Whether a declared media type is an image type.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Stream a multipart body into a [`ConvertForm`].
pub async fn read_convert_form(
    mut multipart: Multipart,
    scratch: &ScratchSpace,
    max_file_size: usize,
) -> Result<ConvertForm, ConvertError> {
    let mut form = ConvertForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();

        match name.as_str() {
            IMAGE_FIELD if is_file => {
                if form.image.is_some() {
                    return Err(ConvertError::UnexpectedField { field: name });
                }
                form.image = Some(store_image(field, scratch, max_file_size).await?);
            }
            FILENAME_FIELD if !is_file => {
                form.filename = Some(read_text(field, max_file_size).await?);
            }
            QUALITY_FIELD if !is_file => {
                form.quality = Some(read_text(field, max_file_size).await?);
            }
            _ if is_file => {
                return Err(ConvertError::UnexpectedField { field: name });
            }
            _ => {
                debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>, max_file_size: usize) -> Result<String, ConvertError> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, max_file_size))
}

/// Write the image part to a fresh temporary file, enforcing type and size.
async fn store_image(
    mut field: Field<'_>,
    scratch: &ScratchSpace,
    max_file_size: usize,
) -> Result<UploadedImage, ConvertError> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    if !is_image_content_type(&content_type) {
        return Err(ConvertError::InvalidFileType { content_type });
    }

    let original_name = field.file_name().unwrap_or("upload").to_string();
    let (file, temp) = scratch.create_upload(&original_name)?;
    let mut file = tokio::fs::File::from_std(file);
    let mut size: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        size += chunk.len() as u64;
        if size > max_file_size as u64 {
            return Err(ConvertError::FileTooLarge {
                limit: max_file_size,
            });
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    debug!(
        path = %temp.display(),
        content_type = %content_type,
        size,
        "Stored upload"
    );

    Ok(UploadedImage {
        file: temp,
        content_type,
        original_name,
        size,
    })
}

fn multipart_error(err: MultipartError, max_file_size: usize) -> ConvertError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ConvertError::FileTooLarge {
            limit: max_file_size,
        }
    } else {
        ConvertError::MalformedBody {
            message: err.body_text(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
