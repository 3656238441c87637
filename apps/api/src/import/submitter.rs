//! Batch Submitter — sends normalized rows to the record server and turns its
//! answer into something an operator can act on.

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::job::NormalizedJobRecord;
use crate::persistence::{BulkImportResponse, CreateJobResponse, JobStore, SkippedRow, StoreError};

/// At most this many skipped rows are listed in a report.
pub const SKIP_DISPLAY_LIMIT: usize = 50;

/// Aggregate outcome of one batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkImportResult {
    pub added_count: usize,
    pub skipped_count: usize,
    pub skipped_rows: Vec<SkippedRow>,
    /// False when the server only answered with a message.
    pub detail_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BulkImportResult {
    /// Reads the server response. A legacy `{message}` answer means every
    /// submitted row was processed and nothing was skipped.
    pub fn from_response(response: BulkImportResponse, submitted: usize) -> Self {
        match response {
            BulkImportResponse::Detailed {
                added_count,
                skipped_count,
                skipped_rows,
                message,
            } => Self {
                added_count,
                skipped_count,
                skipped_rows,
                detail_available: true,
                message,
            },
            BulkImportResponse::Legacy { message } => Self {
                added_count: submitted,
                skipped_count: 0,
                skipped_rows: Vec::new(),
                detail_available: false,
                message: Some(message),
            },
        }
    }

    /// Operator-facing view. `source_line` maps a row index back to the
    /// line of the uploaded file.
    pub fn report(&self, source_line: impl Fn(usize) -> Option<usize>) -> ImportReport {
        let summary = match (&self.message, self.detail_available) {
            (Some(message), false) => message.clone(),
            _ => format!(
                "Added {} jobs. Skipped {}.",
                self.added_count, self.skipped_count
            ),
        };

        let skipped = self
            .skipped_rows
            .iter()
            .take(SKIP_DISPLAY_LIMIT)
            .map(|row| SkipLine {
                row_index: row.row_index,
                source_line: source_line(row.row_index),
                reasons: row.reasons.join(", "),
            })
            .collect();

        ImportReport {
            summary,
            skipped,
            hidden_skips: self.skipped_rows.len().saturating_sub(SKIP_DISPLAY_LIMIT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipLine {
    pub row_index: usize,
    pub source_line: Option<usize>,
    pub reasons: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub summary: String,
    pub skipped: Vec<SkipLine>,
    /// Skipped rows beyond the display limit.
    pub hidden_skips: usize,
}

/// Submits the whole batch in one call. Any transport or server failure is
/// reported as a single `ImportFailed`; nothing is retried.
pub async fn submit(
    store: &dyn JobStore,
    records: &[NormalizedJobRecord],
) -> Result<BulkImportResult, AppError> {
    info!("Submitting batch of {} jobs", records.len());

    let response = store.create_jobs_bulk(records).await.map_err(|e| {
        warn!("Batch submission failed: {e}");
        AppError::ImportFailed(e.to_string())
    })?;

    let result = BulkImportResult::from_response(response, records.len());
    info!(
        "Batch processed: {} added, {} skipped",
        result.added_count, result.skipped_count
    );
    Ok(result)
}

/// Submits a single record. Business-rule rejections keep the server's
/// message verbatim.
pub async fn submit_one(
    store: &dyn JobStore,
    record: &NormalizedJobRecord,
) -> Result<CreateJobResponse, AppError> {
    store.create_job(record).await.map_err(|e| match e {
        StoreError::Rejected(message) => AppError::Rejected(message),
        other => AppError::ImportFailed(other.to_string()),
    })
}
