//! In-process record server for local runs (`PERSISTENCE_BACKEND=memory`)
//! and tests. Applies the same row rules the remote server does.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::models::job::{JobField, NormalizedJobRecord};
use crate::models::salary_band::{BandRates, SalaryBand};
use crate::persistence::{
    BulkImportResponse, CreateJobResponse, JobStore, SkippedRow, StoreError,
};

const REQUIRED: [JobField; 3] = [JobField::CsaId, JobField::Title, JobField::Description];

pub struct MemoryJobStore {
    bands: Vec<SalaryBand>,
    jobs: Mutex<Vec<NormalizedJobRecord>>,
}

impl MemoryJobStore {
    pub fn new(bands: Vec<SalaryBand>) -> Self {
        Self {
            bands,
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Seeded with the production band table.
    pub fn with_reference_bands() -> Self {
        Self::new(reference_bands())
    }

    #[cfg(test)]
    pub async fn jobs(&self) -> Vec<NormalizedJobRecord> {
        self.jobs.lock().await.clone()
    }
}

/// Reasons the server refuses `job`, given the `csa_id`s already taken.
fn rejection_reasons(job: &NormalizedJobRecord, taken: &HashSet<String>) -> Vec<String> {
    let mut reasons: Vec<String> = REQUIRED
        .iter()
        .filter(|f| job.get(**f).trim().is_empty())
        .map(|f| format!("Missing required field: {f}"))
        .collect();

    let csa_id = job.csa_id.trim();
    if !csa_id.is_empty() && taken.contains(csa_id) {
        reasons.push(format!("Duplicate csa_id '{csa_id}'"));
    }
    reasons
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn fetch_salary_bands(&self) -> Result<Vec<SalaryBand>, StoreError> {
        Ok(self.bands.clone())
    }

    async fn create_job(&self, job: &NormalizedJobRecord) -> Result<CreateJobResponse, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let taken: HashSet<String> = jobs.iter().map(|j| j.csa_id.trim().to_string()).collect();

        let reasons = rejection_reasons(job, &taken);
        if !reasons.is_empty() {
            return Err(StoreError::Rejected(reasons.join("; ")));
        }

        jobs.push(job.clone());
        Ok(CreateJobResponse {
            message: Some("Job added successfully".to_string()),
            job_id: Some(format!("jb{:04}", jobs.len())),
        })
    }

    async fn create_jobs_bulk(
        &self,
        batch: &[NormalizedJobRecord],
    ) -> Result<BulkImportResponse, StoreError> {
        let mut jobs = self.jobs.lock().await;
        let mut taken: HashSet<String> =
            jobs.iter().map(|j| j.csa_id.trim().to_string()).collect();

        let mut added_count = 0;
        let mut skipped_rows = Vec::new();
        for (row_index, job) in batch.iter().enumerate() {
            let reasons = rejection_reasons(job, &taken);
            if reasons.is_empty() {
                taken.insert(job.csa_id.trim().to_string());
                jobs.push(job.clone());
                added_count += 1;
            } else {
                skipped_rows.push(SkippedRow { row_index, reasons });
            }
        }

        info!(
            "Memory store bulk insert: {} added, {} skipped",
            added_count,
            skipped_rows.len()
        );

        Ok(BulkImportResponse::Detailed {
            added_count,
            skipped_count: skipped_rows.len(),
            skipped_rows,
            message: None,
        })
    }
}

pub fn reference_bands() -> Vec<SalaryBand> {
    let band = |name: &str, experience: Option<&str>, standard: f64, ra1: f64, ra2: f64| SalaryBand {
        band: name.to_string(),
        experience_range: experience.map(String::from),
        rates: BandRates {
            standard: Some(standard),
            ra1: Some(ra1),
            ra2: Some(ra2),
        },
    };

    vec![
        band("6A", Some("1-3 years"), 310.0, 388.0, 403.0),
        band("6B", Some("3-5 years"), 478.0, 596.0, 620.0),
        band("7A", Some("5-7 Years"), 661.0, 803.0, 832.0),
        band("7B", Some("7-9 yrs"), 823.0, 977.0, 1016.0),
        band("8", None, 1064.0, 1263.0, 1327.0),
        band("9", None, 1216.0, 1712.0, 1790.0),
    ]
}
