use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDate};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    DocumentListResponse, DocumentResponse, DraftResponse, KindQuery, NumberPreviewResponse,
    SaveStatusResponse,
};
use crate::models::DocumentDraft;
use crate::render::PrintJob;
use crate::services::SaveStatus;
use crate::startup::AppState;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let lists = state.documents.list().await?;
    Ok(Json(DocumentListResponse::from(lists)))
}

pub async fn number_preview(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> Result<impl IntoResponse, AppError> {
    let document_number = state.documents.preview_number(query.kind, today()).await?;
    Ok(Json(NumberPreviewResponse {
        kind: query.kind,
        document_number,
    }))
}

/// Blank form for a new document of the requested kind.
pub async fn new_draft(
    State(state): State<AppState>,
    Query(query): Query<KindQuery>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state.documents.new_draft(query.kind, today()).await?;
    Ok(Json(DraftResponse::from(draft)))
}

pub async fn create_document(
    State(state): State<AppState>,
    Json(draft): Json<DocumentDraft>,
) -> Result<impl IntoResponse, AppError> {
    let saved = state.documents.create(draft, today()).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(saved))))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let saved = state.documents.load(id).await?;
    Ok(Json(DocumentResponse::from(saved)))
}

/// Manual save; supersedes any auto-save still waiting on its timer.
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<DocumentDraft>,
) -> Result<impl IntoResponse, AppError> {
    state.autosave.cancel_pending(id).await;
    let saved = state.documents.update(id, draft).await?;
    Ok(Json(DocumentResponse::from(saved)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.autosave.close(id);
    state.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record an edit of a saved document for debounced saving.
pub async fn track_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<DocumentDraft>,
) -> Result<impl IntoResponse, AppError> {
    // Unknown documents never get a session.
    state.documents.load(id).await?;
    let status = state.autosave.track(id, draft).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SaveStatusResponse {
            document_id: id,
            session_open: true,
            status,
        }),
    ))
}

pub async fn close_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    state.autosave.close(id);
    StatusCode::NO_CONTENT
}

pub async fn save_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let status = state.autosave.status(id);
    Json(SaveStatusResponse {
        document_id: id,
        session_open: status.is_some(),
        status: status.unwrap_or(SaveStatus::Idle),
    })
}

pub async fn preview_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.documents.print_job(id).await?;
    export(&state, job)
}

/// Render unsaved form state without persisting anything.
pub async fn preview_draft(
    State(state): State<AppState>,
    Json(draft): Json<DocumentDraft>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.documents.preview_draft(draft, today()).await?;
    export(&state, job)
}

fn export(state: &AppState, job: PrintJob) -> Result<impl IntoResponse, AppError> {
    let body = state.exporter.export(&job)?;
    Ok((
        [
            (header::CONTENT_TYPE, state.exporter.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.html\"", job.title),
            ),
        ],
        body,
    ))
}
