use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::compensation::CompensationEdit;
use crate::import::preview::{PreviewResponse, PreviewRow};
use crate::import::service::{self, ConfirmResponse, ManualJobResponse, Upload};
use crate::import::template::{SAMPLE_TEMPLATE, TEMPLATE_FILE_NAME};
use crate::models::job::NormalizedJobRecord;
use crate::models::salary_band::SalaryBandTable;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";

/// GET /api/v1/salary-bands
pub async fn handle_salary_bands(
    State(state): State<AppState>,
) -> Result<Json<SalaryBandTable>, AppError> {
    let table = service::salary_bands(&state).await?;
    Ok(Json(table.as_ref().clone()))
}

/// GET /api/v1/jobs/imports/template
pub async fn handle_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{TEMPLATE_FILE_NAME}\""),
            ),
        ],
        SAMPLE_TEMPLATE,
    )
}

/// POST /api/v1/jobs/imports
/// Multipart upload; the file goes in the `file` field.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PreviewResponse>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some(Upload {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload
        .ok_or_else(|| AppError::Validation(format!("Missing '{UPLOAD_FIELD}' field")))?;
    let preview = service::start_import(&state, upload).await?;
    Ok((StatusCode::CREATED, Json(preview)))
}

/// GET /api/v1/jobs/imports/:id
pub async fn handle_get_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewResponse>, AppError> {
    Ok(Json(service::get_preview(&state, id).await?))
}

/// PATCH /api/v1/jobs/imports/:id/rows/:row_index
pub async fn handle_edit_row(
    State(state): State<AppState>,
    Path((id, row_index)): Path<(Uuid, usize)>,
    Json(edit): Json<CompensationEdit>,
) -> Result<Json<PreviewRow>, AppError> {
    Ok(Json(service::edit_row(&state, id, row_index, edit).await?))
}

/// POST /api/v1/jobs/imports/:id/confirm
pub async fn handle_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmResponse>, AppError> {
    Ok(Json(service::confirm_import(&state, id).await?))
}

/// POST /api/v1/jobs
/// Manual entry of a single job.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(record): Json<NormalizedJobRecord>,
) -> Result<(StatusCode, Json<ManualJobResponse>), AppError> {
    let response = service::create_manual_job(&state, record).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
