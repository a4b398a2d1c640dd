use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{UnitRequest, UnitsResponse};
use crate::models::SettingsUpdate;
use crate::services::LogoUpload;
use crate::startup::AppState;

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.settings.get().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.settings.update(update).await?))
}

pub async fn list_units(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UnitsResponse {
        units: state.settings.units().await?,
    }))
}

pub async fn add_unit(
    State(state): State<AppState>,
    Json(request): Json<UnitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings.add_unit(&request.name).await?;
    Ok((StatusCode::CREATED, Json(settings)))
}

pub async fn remove_unit(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.settings.remove_unit(index).await?))
}

pub async fn upload_logo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    let file_name = field.file_name().unwrap_or("logo").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?
        .to_vec();

    let settings = state
        .settings
        .upload_logo(LogoUpload {
            file_name,
            content_type,
            data,
        })
        .await?;

    Ok(Json(settings))
}

pub async fn remove_logo(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.settings.remove_logo().await?))
}
