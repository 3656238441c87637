//! Row Validator — advisory checks run before records reach the record server.
//!
//! The record server is authoritative and may reject rows for reasons these
//! checks cannot see (duplicate `csa_id`). Row failures here never block a
//! submission; only a failed header check does.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::import::compensation::parse_leading_number;
use crate::import::normalizer::header_matches;
use crate::models::job::{JobField, NormalizedJobRecord};
use crate::models::salary_band::SalaryRate;

/// Columns a spreadsheet must carry before a batch can be submitted.
pub const REQUIRED_COLUMNS: [JobField; 3] = [JobField::CsaId, JobField::Title, JobField::Description];

pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];

const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];

/// Which entry path a record came through. Only the mandatory-field set differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    Bulk,
    Manual,
}

impl EntryMode {
    pub fn required_fields(&self) -> &'static [JobField] {
        match self {
            EntryMode::Bulk => &REQUIRED_COLUMNS,
            EntryMode::Manual => &JobField::ALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub row_index: usize,
    pub is_valid: bool,
    pub reasons: Vec<String>,
}

/// Validates one record. Reasons are in field order: missing fields first,
/// then value checks.
pub fn validate(record: &NormalizedJobRecord, row_index: usize, mode: EntryMode) -> ValidationResult {
    let mut reasons: Vec<String> = mode
        .required_fields()
        .iter()
        .filter(|field| record.get(**field).trim().is_empty())
        .map(|field| format!("Missing required field: {field}"))
        .collect();

    let rate = record.salary_rate.trim();
    if !rate.is_empty() && rate.parse::<SalaryRate>().is_err() {
        let allowed: Vec<&str> = SalaryRate::ALL.iter().map(|r| r.as_str()).collect();
        reasons.push(format!(
            "Invalid salary_rate '{rate}' (expected one of: {})",
            allowed.join(", ")
        ));
    }

    let priority = record.priority.trim();
    if !priority.is_empty() && !PRIORITIES.contains(&priority.to_lowercase().as_str()) {
        reasons.push(format!(
            "Invalid priority '{priority}' (expected one of: {})",
            PRIORITIES.join(", ")
        ));
    }

    let profit = record.profit_percentage.trim();
    if !profit.is_empty() && parse_leading_number(profit).is_none() {
        reasons.push(format!("profit_percentage '{profit}' is not a number"));
    }

    for field in [JobField::StartDate, JobField::EndDate] {
        let value = record.get(field).trim();
        if !value.is_empty() && !is_valid_date(value) {
            reasons.push(format!("Invalid {field} '{value}' (expected dd-mm-yyyy or yyyy-mm-dd)"));
        }
    }

    ValidationResult {
        row_index,
        is_valid: reasons.is_empty(),
        reasons,
    }
}

fn is_valid_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Outcome of the once-per-file column check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCheck {
    pub valid: bool,
    pub missing: Vec<String>,
}

impl HeaderCheck {
    /// Converts a failed check into the blocking error.
    pub fn ensure(&self) -> Result<(), AppError> {
        if self.valid {
            Ok(())
        } else {
            Err(AppError::MissingRequiredColumns(self.missing.clone()))
        }
    }
}

/// Every required column must be matched by at least one header alias.
pub fn check_headers(headers: &[String]) -> HeaderCheck {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|field| !headers.iter().any(|h| header_matches(h, **field)))
        .map(|field| field.name().to_string())
        .collect();

    HeaderCheck {
        valid: missing.is_empty(),
        missing,
    }
}
