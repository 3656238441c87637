//! Pipeline orchestration: upload → decode → normalize → compute → preview,
//! then confirm → batch submit. Handlers stay thin and call into here.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::compensation::{compute_derived, CompensationEdit};
use crate::import::decoder::decode;
use crate::import::preview::{ImportSession, PreviewResponse, PreviewRow, SubmissionStatus};
use crate::import::submitter::{self, BulkImportResult, ImportReport};
use crate::import::validation::{validate, EntryMode};
use crate::models::job::NormalizedJobRecord;
use crate::models::salary_band::SalaryBandTable;
use crate::state::AppState;

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub import_id: Uuid,
    pub result: BulkImportResult,
    pub report: ImportReport,
}

#[derive(Debug, Serialize)]
pub struct ManualJobResponse {
    pub job: NormalizedJobRecord,
    pub job_id: Option<String>,
    pub message: Option<String>,
}

/// Band table, fetched from the record server on first use and kept for
/// the life of the process.
pub async fn salary_bands(state: &AppState) -> Result<Arc<SalaryBandTable>, AppError> {
    let table = state
        .bands
        .get_or_try_init(|| async {
            let bands = state.store.fetch_salary_bands().await.map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to fetch salary bands: {e}"))
            })?;
            let table = SalaryBandTable::new(bands);
            info!("Loaded {} salary bands", table.len());
            Ok::<_, AppError>(Arc::new(table))
        })
        .await?;
    Ok(Arc::clone(table))
}

/// Decodes an upload and opens an import session for it.
pub async fn start_import(state: &AppState, upload: Upload) -> Result<PreviewResponse, AppError> {
    let bands = salary_bands(state).await?;
    let table = decode(
        &upload.bytes,
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
    )?;

    let session = ImportSession::from_table(table, upload.file_name, &bands);
    if !session.header_check.valid {
        warn!(
            "Upload {} is missing required columns: {:?}",
            session.id, session.header_check.missing
        );
    }
    let preview = session.project(state.config.preview_row_limit);
    state.imports.insert(session).await;

    info!(
        "Opened import {} with {} rows",
        preview.import_id, preview.total_rows
    );
    Ok(preview)
}

pub async fn get_preview(state: &AppState, import_id: Uuid) -> Result<PreviewResponse, AppError> {
    let limit = state.config.preview_row_limit;
    state
        .imports
        .with(import_id, |session| Ok(session.project(limit)))
        .await
}

pub async fn edit_row(
    state: &AppState,
    import_id: Uuid,
    row_index: usize,
    edit: CompensationEdit,
) -> Result<PreviewRow, AppError> {
    let bands = salary_bands(state).await?;
    state
        .imports
        .with(import_id, |session| {
            session.edit_row(row_index, edit, &bands).cloned()
        })
        .await
}

/// Submits every row of the import in one call.
///
/// Blocked by a failed header check. A second confirm while one is in
/// flight is refused. On failure the session returns to draft so the
/// operator can resubmit.
///
/// The submission and its status bookkeeping run on their own task, so a
/// caller that goes away mid-request cannot leave the session stuck in
/// `Submitting`.
pub async fn confirm_import(
    state: &AppState,
    import_id: Uuid,
) -> Result<ConfirmResponse, AppError> {
    let records = state
        .imports
        .with(import_id, |session| {
            session.header_check.ensure()?;
            if session.status == SubmissionStatus::Submitting {
                return Err(AppError::Conflict(format!(
                    "Import {import_id} is already being submitted"
                )));
            }
            session.status = SubmissionStatus::Submitting;
            Ok(session.records())
        })
        .await?;

    let store = Arc::clone(&state.store);
    let imports = Arc::clone(&state.imports);
    let submission = tokio::spawn(async move {
        let outcome = submitter::submit(store.as_ref(), &records).await;
        let report = imports
            .with(import_id, |session| match &outcome {
                Ok(result) => {
                    session.status = SubmissionStatus::Submitted;
                    session.last_result = Some(result.clone());
                    Ok(Some(result.report(|i| session.source_line(i))))
                }
                Err(_) => {
                    session.status = SubmissionStatus::Draft;
                    Ok(None)
                }
            })
            .await?;
        Ok::<_, AppError>((outcome?, report))
    });

    let (result, report) = match submission.await {
        Ok(finished) => finished?,
        Err(join_err) => {
            error!("Submission task for import {import_id} aborted: {join_err}");
            state
                .imports
                .with(import_id, |session| {
                    session.status = SubmissionStatus::Draft;
                    Ok(())
                })
                .await?;
            return Err(AppError::ImportFailed(join_err.to_string()));
        }
    };

    Ok(ConfirmResponse {
        import_id,
        report: report.unwrap_or_else(|| result.report(|_| None)),
        result,
    })
}

/// Manual single-record path: same calculator, stricter mandatory fields.
pub async fn create_manual_job(
    state: &AppState,
    record: NormalizedJobRecord,
) -> Result<ManualJobResponse, AppError> {
    let bands = salary_bands(state).await?;
    let record = compute_derived(
        NormalizedJobRecord {
            salary_rate: record.salary_rate.to_lowercase(),
            ..record
        },
        &bands,
    );

    let validation = validate(&record, 0, EntryMode::Manual);
    if !validation.is_valid {
        return Err(AppError::Validation(validation.reasons.join("; ")));
    }

    let response = submitter::submit_one(state.store.as_ref(), &record).await?;
    info!("Created job {:?} for csa_id '{}'", response.job_id, record.csa_id);

    Ok(ManualJobResponse {
        job: record,
        job_id: response.job_id,
        message: response.message,
    })
}
