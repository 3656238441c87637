//! Preview Projection — the normalized, computed rows of one upload, held
//! until the operator confirms or abandons it.
//!
//! Sessions live in memory only. Row edits replace the stored row with a
//! recomputed copy; nothing here talks to the record server.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::import::compensation::{apply_edit, compute_derived, CompensationEdit};
use crate::import::decoder::{DecodedTable, FileFormat};
use crate::import::normalizer::{find_header, normalize};
use crate::import::submitter::{BulkImportResult, ImportReport};
use crate::import::validation::{check_headers, validate, EntryMode, HeaderCheck, ValidationResult};
use crate::models::job::{JobField, NormalizedJobRecord};
use crate::models::salary_band::SalaryBandTable;

/// A normalized row plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub row_index: usize,
    pub source_line: usize,
    #[serde(flatten)]
    pub record: NormalizedJobRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitting,
    Submitted,
}

/// Which uploaded column, if any, fills a canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub field: &'static str,
    pub header: Option<String>,
}

fn column_mapping(headers: &[String]) -> Vec<ColumnMapping> {
    JobField::ALL
        .iter()
        .map(|&field| ColumnMapping {
            field: field.name(),
            header: find_header(headers, field).map(String::from),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorySummary {
    pub valid_count: usize,
    pub invalid_rows: Vec<ValidationResult>,
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub format: FileFormat,
    pub headers: Vec<String>,
    pub header_check: HeaderCheck,
    pub rows: Vec<PreviewRow>,
    pub status: SubmissionStatus,
    pub last_result: Option<BulkImportResult>,
    /// Last time the session was opened, read or edited.
    pub touched_at: DateTime<Utc>,
}

impl ImportSession {
    /// Normalizes every decoded row and fills its derived compensation fields.
    pub fn from_table(
        table: DecodedTable,
        file_name: Option<String>,
        bands: &SalaryBandTable,
    ) -> Self {
        let header_check = check_headers(&table.headers);
        let rows = table
            .rows
            .iter()
            .map(|raw| PreviewRow {
                row_index: raw.row_index,
                source_line: raw.source_line,
                record: compute_derived(normalize(raw), bands),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            file_name,
            format: table.format,
            headers: table.headers,
            header_check,
            rows,
            status: SubmissionStatus::Draft,
            last_result: None,
            touched_at: Utc::now(),
        }
    }

    /// Records in data-row order, ready for submission.
    pub fn records(&self) -> Vec<NormalizedJobRecord> {
        self.rows.iter().map(|r| r.record.clone()).collect()
    }

    pub fn source_line(&self, row_index: usize) -> Option<usize> {
        self.rows
            .iter()
            .find(|r| r.row_index == row_index)
            .map(|r| r.source_line)
    }

    /// Replaces row `row_index` with an edited, recomputed copy.
    pub fn edit_row(
        &mut self,
        row_index: usize,
        edit: CompensationEdit,
        bands: &SalaryBandTable,
    ) -> Result<&PreviewRow, AppError> {
        if self.status == SubmissionStatus::Submitting {
            return Err(AppError::Conflict(
                "Rows cannot be edited while the batch is being submitted".to_string(),
            ));
        }

        let slot = self
            .rows
            .iter_mut()
            .find(|r| r.row_index == row_index)
            .ok_or_else(|| AppError::NotFound(format!("Row {row_index} not found")))?;

        debug!("Editing row {row_index}: {edit:?}");
        *slot = PreviewRow {
            record: apply_edit(&slot.record, edit, bands),
            ..slot.clone()
        };
        self.status = SubmissionStatus::Draft;
        Ok(slot)
    }

    /// Advisory bulk-mode validation over every row, not just the projected ones.
    pub fn advisory(&self) -> AdvisorySummary {
        let results: Vec<ValidationResult> = self
            .rows
            .iter()
            .map(|r| validate(&r.record, r.row_index, EntryMode::Bulk))
            .collect();

        AdvisorySummary {
            valid_count: results.iter().filter(|r| r.is_valid).count(),
            invalid_rows: results.into_iter().filter(|r| !r.is_valid).collect(),
        }
    }

    /// Read-only view with the first `limit` rows.
    pub fn project(&self, limit: usize) -> PreviewResponse {
        PreviewResponse {
            import_id: self.id,
            file_name: self.file_name.clone(),
            format: self.format,
            headers: self.headers.clone(),
            column_mapping: column_mapping(&self.headers),
            header_check: self.header_check.clone(),
            total_rows: self.rows.len(),
            rows: self.rows.iter().take(limit).cloned().collect(),
            advisory: self.advisory(),
            status: self.status,
            report: self
                .last_result
                .as_ref()
                .map(|result| result.report(|i| self.source_line(i))),
            last_result: self.last_result.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub import_id: Uuid,
    pub file_name: Option<String>,
    pub format: FileFormat,
    pub headers: Vec<String>,
    pub column_mapping: Vec<ColumnMapping>,
    pub header_check: HeaderCheck,
    pub total_rows: usize,
    pub rows: Vec<PreviewRow>,
    pub advisory: AdvisorySummary,
    pub status: SubmissionStatus,
    pub last_result: Option<BulkImportResult>,
    pub report: Option<ImportReport>,
}

/// All open import sessions, keyed by id.
pub struct ImportSessions {
    sessions: Mutex<HashMap<Uuid, ImportSession>>,
    ttl: Duration,
}

impl ImportSessions {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Stores `session`, dropping sessions idle for longer than the TTL.
    /// A session marked as submitting gets twice the TTL before it is
    /// considered abandoned.
    pub async fn insert(&self, session: ImportSession) -> Uuid {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| {
            let limit = match s.status {
                SubmissionStatus::Submitting => self.ttl * 2,
                _ => self.ttl,
            };
            s.touched_at >= now - limit
        });
        if sessions.len() < before {
            info!("Pruned {} expired import sessions", before - sessions.len());
        }

        let id = session.id;
        sessions.insert(id, session);
        id
    }

    /// Runs `f` against the session under the lock and marks it as active.
    pub async fn with<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ImportSession) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Import {id} not found")))?;
        session.touched_at = Utc::now();
        f(session)
    }
}
