use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};

use crate::http::AppError;

pub const IMAGE_FIELD: &str = "image";
pub const TARGET_FORMAT_FIELD: &str = "targetFormat";

/// Body limit headroom for the multipart framing around the image.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Default)]
pub struct ConvertForm {
    pub image: Option<UploadedImage>,
    pub target_format: Option<String>,
}

/// Reads the convert form, applying the image filter while the upload is
/// still streaming: a non-image MIME type or a file over `max_bytes` is
/// rejected before anything is buffered past the limit.
pub async fn read_convert_form(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<ConvertForm, AppError> {
    let mut form = ConvertForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            IMAGE_FIELD => form.image = Some(read_image(field, max_bytes).await?),
            TARGET_FORMAT_FIELD => {
                form.target_format = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_image(mut field: Field<'_>, max_bytes: usize) -> Result<UploadedImage, AppError> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with("image/") {
        return Err(AppError::bad_request("Only images are allowed"));
    }
    let file_name = field.file_name().unwrap_or_default().to_string();

    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > max_bytes {
            return Err(file_too_large());
        }
        data.extend_from_slice(&chunk);
    }

    Ok(UploadedImage {
        file_name,
        content_type,
        data: data.freeze(),
    })
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return file_too_large();
    }
    tracing::warn!(error = %err, "malformed multipart upload");
    AppError::bad_request("Malformed upload")
}

fn file_too_large() -> AppError {
    AppError::bad_request("File too large")
}
