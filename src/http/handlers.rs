use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::app::conversions::ConversionService;
use crate::domain::conversion::{Conversion, TargetFormat};
use crate::http::upload;
use crate::http::AppError;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub converted_image: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

fn conversion_service(state: &AppState) -> ConversionService {
    ConversionService::new(state.store.clone(), state.uploads.clone())
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

pub async fn convert_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    // A request that is not multipart at all carries no file.
    let multipart = multipart.map_err(|_| AppError::bad_request("No image file uploaded"))?;

    let form = upload::read_convert_form(multipart, state.upload_max_bytes).await?;
    let image = form
        .image
        .ok_or_else(|| AppError::bad_request("No image file uploaded"))?;
    let format = form
        .target_format
        .as_deref()
        .and_then(TargetFormat::parse)
        .ok_or_else(|| AppError::bad_request("Invalid target format"))?;

    let original_name = image.file_name.clone();
    let converted = conversion_service(&state)
        .convert(image.file_name, image.data, format)
        .await
        .map_err(|err| {
            tracing::error!(
                error = ?err,
                original_name = %original_name,
                content_type = %image.content_type,
                format = %format,
                "failed to convert image"
            );
            AppError::internal("Error converting image")
        })?;

    Ok(Json(ConvertResponse {
        success: true,
        converted_image: converted.asset_path,
        message: "Image converted successfully",
    }))
}

pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<Conversion>>, AppError> {
    let records = conversion_service(&state).history().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to fetch history");
        AppError::internal("Error fetching history")
    })?;

    Ok(Json(records))
}

pub async fn delete_image(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteResponse>, AppError> {
    // Ids are store-assigned UUIDs; anything else cannot name a record.
    let id = Uuid::parse_str(&id).map_err(|_| AppError::not_found("Image not found"))?;

    let deleted = conversion_service(&state).delete(id).await.map_err(|err| {
        tracing::error!(error = ?err, conversion_id = %id, "failed to delete image");
        AppError::internal("Error deleting image")
    })?;

    if deleted {
        Ok(Json(DeleteResponse {
            success: true,
            message: "Image deleted successfully",
        }))
    } else {
        Err(AppError::not_found("Image not found"))
    }
}
