//! Record server boundary — the only place job records leave this service.
//!
//! The record server owns uniqueness of `csa_id` and the final accept/reject
//! decision for every row. `AppState` carries an `Arc<dyn JobStore>`, picked
//! at startup from `PERSISTENCE_BACKEND`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::job::NormalizedJobRecord;
use crate::models::salary_band::SalaryBand;

pub mod memory;

const SALARY_BANDS_PATH: &str = "/admin/salary-bands";
const ADD_JOB_PATH: &str = "/admin/add-job";
const ADD_JOBS_BULK_PATH: &str = "/admin/add-jobs-bulk";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record server error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Business-rule rejection; the message is meant for the operator as is.
    #[error("{0}")]
    Rejected(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row the record server refused, keyed by its position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_index: usize,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Response of the bulk endpoint. Older servers answer with a bare message
/// and no per-row detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BulkImportResponse {
    Detailed {
        added_count: usize,
        skipped_count: usize,
        #[serde(default)]
        skipped_rows: Vec<SkippedRow>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Legacy {
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn fetch_salary_bands(&self) -> Result<Vec<SalaryBand>, StoreError>;

    async fn create_job(&self, job: &NormalizedJobRecord) -> Result<CreateJobResponse, StoreError>;

    /// One call for the whole batch. Implementations must not retry.
    async fn create_jobs_bulk(
        &self,
        jobs: &[NormalizedJobRecord],
    ) -> Result<BulkImportResponse, StoreError>;
}

/// Error body shapes the record server uses for rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP client for the record server.
#[derive(Clone)]
pub struct HttpJobStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpJobStore {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Record server returned {}: {}", status, body);

        if status.is_client_error() {
            if let Some(detail) = rejection_detail(&body) {
                return Err(StoreError::Rejected(detail));
            }
        }

        Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        })
    }
}

/// Pulls the operator-facing message out of a `{"detail": ...}` error body.
/// Validation errors arrive as a list of `{"msg": ...}` objects.
fn rejection_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(String::from)
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn fetch_salary_bands(&self) -> Result<Vec<SalaryBand>, StoreError> {
        let bands: Vec<SalaryBand> = self
            .send_json(self.client.get(self.url(SALARY_BANDS_PATH)))
            .await?;
        debug!("Fetched {} salary bands", bands.len());
        Ok(bands)
    }

    async fn create_job(&self, job: &NormalizedJobRecord) -> Result<CreateJobResponse, StoreError> {
        self.send_json(self.client.post(self.url(ADD_JOB_PATH)).json(job))
            .await
    }

    async fn create_jobs_bulk(
        &self,
        jobs: &[NormalizedJobRecord],
    ) -> Result<BulkImportResponse, StoreError> {
        self.send_json(self.client.post(self.url(ADD_JOBS_BULK_PATH)).json(jobs))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_response_parses() {
        let json = r#"{"added_count":2,"skipped_count":1,"skipped_rows":[{"row_index":1,"reasons":["Duplicate csa_id"]}]}"#;
        let parsed: BulkImportResponse = serde_json::from_str(json).unwrap();
        match parsed {
            BulkImportResponse::Detailed {
                added_count,
                skipped_rows,
                ..
            } => {
                assert_eq!(added_count, 2);
                assert_eq!(skipped_rows[0].row_index, 1);
            }
            other => panic!("expected detailed response, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_response_parses() {
        let parsed: BulkImportResponse =
            serde_json::from_str(r#"{"message":"Successfully added 3 jobs"}"#).unwrap();
        assert_eq!(
            parsed,
            BulkImportResponse::Legacy {
                message: "Successfully added 3 jobs".into()
            }
        );
    }

    #[test]
    fn test_rejection_detail_string() {
        assert_eq!(
            rejection_detail(r#"{"detail":"CSA ID already exists"}"#),
            Some("CSA ID already exists".to_string())
        );
    }

    #[test]
    fn test_rejection_detail_list() {
        let body = r#"{"detail":[{"loc":["body","title"],"msg":"field required"},{"msg":"bad date"}]}"#;
        assert_eq!(
            rejection_detail(body),
            Some("field required; bad date".to_string())
        );
    }

    #[test]
    fn test_rejection_detail_unparseable() {
        assert_eq!(rejection_detail("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store =
            HttpJobStore::new("http://records.local/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            store.url(ADD_JOBS_BULK_PATH),
            "http://records.local/admin/add-jobs-bulk"
        );
    }
}
