use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::NewClient;
use crate::startup::AppState;

pub async fn list_clients(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.settings.list_clients().await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<NewClient>,
) -> Result<impl IntoResponse, AppError> {
    let client = state.settings.add_client(input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.settings.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
