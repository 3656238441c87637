//! Column Normalizer — maps header-keyed raw cells onto the canonical job schema.

use crate::import::decoder::RawRow;
use crate::models::job::{JobField, NormalizedJobRecord};

/// Accepted header spellings per canonical field, checked case-insensitively
/// as substrings of the header. Every canonical field has at least its own
/// name as an alias, so normalizing an already-normalized record is a no-op.
pub const COLUMN_ALIASES: &[(JobField, &[&str])] = &[
    (JobField::CsaId, &["csa_id", "csa id"]),
    (JobField::Title, &["title", "job title"]),
    (JobField::Description, &["description", "job description"]),
    (JobField::Location, &["location"]),
    (JobField::SalaryBand, &["salary_band", "band"]),
    (JobField::SalaryRate, &["salary_rate", "rate"]),
    (
        JobField::ProfitPercentage,
        &["profit_percentage", "profit percentage"],
    ),
    (JobField::ActualSalary, &["actual_salary", "actual salary"]),
    (
        JobField::ExpectedPackage,
        &["expected_package", "expected package"],
    ),
    (JobField::Priority, &["priority"]),
    (JobField::StartDate, &["start_date", "start date"]),
    (JobField::EndDate, &["end_date", "end date"]),
    (JobField::AssignedHr, &["assigned_hr", "assigned hr"]),
];

/// Alias list for `field`. Empty only if the table is missing an entry.
pub fn aliases_for(field: JobField) -> &'static [&'static str] {
    COLUMN_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// True if `header` contains any alias of `field`, ignoring case.
pub fn header_matches(header: &str, field: JobField) -> bool {
    let header = header.to_lowercase();
    aliases_for(field)
        .iter()
        .any(|alias| header.contains(&alias.to_lowercase()))
}

/// First header, in column order, that matches `field`.
pub fn find_header<'a>(headers: &'a [String], field: JobField) -> Option<&'a str> {
    headers
        .iter()
        .map(String::as_str)
        .find(|h| header_matches(h, field))
}

/// Builds the canonical record for one raw row.
///
/// For each field the first matching column wins, even if its cell is empty.
/// Unmatched fields are `""`. Rates are lowercased so they compare against
/// the band table's rate keys.
pub fn normalize(row: &RawRow) -> NormalizedJobRecord {
    JobField::ALL
        .iter()
        .fold(NormalizedJobRecord::default(), |record, &field| {
            let value = row
                .cells
                .iter()
                .find(|cell| header_matches(&cell.header, field))
                .map(|cell| cell.value.as_str())
                .unwrap_or("");
            let value = match field {
                JobField::SalaryRate => value.to_lowercase(),
                _ => value.to_string(),
            };
            record.with(field, value)
        })
}
