//! Compensation Calculator — derives `actual_salary` and `expected_package`.
//!
//! Both calculators are total: any missing or unusable input yields `""`.
//! Results are plain shortest-round-trip decimals with no currency rounding.
//!
//! Dependency order is one-way: band/rate → actual_salary → expected_package,
//! and profit → expected_package only. A profit edit never creates an
//! actual salary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::job::NormalizedJobRecord;
use crate::models::salary_band::SalaryBandTable;

/// Hours-per-year equivalent applied to a band's hourly multiplier.
pub const ANNUAL_HOURS: f64 = 1920.0;

/// `multiplier(band, rate) × 1920`, or `""` if band/rate is empty or unknown.
pub fn actual_salary(band: &str, rate: &str, table: &SalaryBandTable) -> String {
    if band.is_empty() || rate.is_empty() {
        return String::new();
    }

    match table.multiplier(band, rate) {
        Some(multiplier) if multiplier != 0.0 => format_decimal(multiplier * ANNUAL_HOURS),
        _ => {
            debug!("No multiplier for band '{band}' at rate '{rate}'");
            String::new()
        }
    }
}

/// `actual − actual × profit / 100`, or `""` if either input is empty or not numeric.
pub fn expected_package(actual_salary: &str, profit_percentage: &str) -> String {
    if actual_salary.is_empty() || profit_percentage.is_empty() {
        return String::new();
    }

    let (Some(actual), Some(profit)) = (
        parse_leading_number(actual_salary),
        parse_leading_number(profit_percentage),
    ) else {
        return String::new();
    };

    format_decimal(actual - actual * (profit / 100.0))
}

/// Fills both derived fields from scratch. Used when a row first enters the
/// pipeline and on the manual single-record path; any derived values the
/// caller supplied are discarded.
pub fn compute_derived(record: NormalizedJobRecord, table: &SalaryBandTable) -> NormalizedJobRecord {
    let actual = actual_salary(&record.salary_band, &record.salary_rate, table);
    let expected = if actual.is_empty() {
        String::new()
    } else {
        expected_package(&actual, &record.profit_percentage)
    };
    debug!(
        "Derived compensation for '{}': actual={actual:?} expected={expected:?}",
        record.csa_id
    );

    NormalizedJobRecord {
        actual_salary: actual,
        expected_package: expected,
        ..record
    }
}

/// A user edit to one of the compensation inputs of a previewed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum CompensationEdit {
    SalaryBand(String),
    SalaryRate(String),
    ProfitPercentage(String),
}

/// Applies `edit` to a copy of `record` and recomputes what depends on it.
///
/// Band/rate edits recompute `actual_salary`, then `expected_package` if a
/// profit is set. A profit edit recomputes `expected_package` only when an
/// `actual_salary` already exists; otherwise the package is left as is.
pub fn apply_edit(
    record: &NormalizedJobRecord,
    edit: CompensationEdit,
    table: &SalaryBandTable,
) -> NormalizedJobRecord {
    let mut next = record.clone();

    match edit {
        CompensationEdit::SalaryBand(band) => {
            next.salary_band = band;
            recompute_from_band_and_rate(&mut next, table);
        }
        CompensationEdit::SalaryRate(rate) => {
            next.salary_rate = rate.to_lowercase();
            recompute_from_band_and_rate(&mut next, table);
        }
        CompensationEdit::ProfitPercentage(profit) => {
            next.profit_percentage = profit;
            if !next.actual_salary.is_empty() {
                next.expected_package =
                    expected_package(&next.actual_salary, &next.profit_percentage);
            }
        }
    }

    next
}

fn recompute_from_band_and_rate(record: &mut NormalizedJobRecord, table: &SalaryBandTable) {
    record.actual_salary = actual_salary(&record.salary_band, &record.salary_rate, table);
    if !record.profit_percentage.is_empty() {
        record.expected_package =
            expected_package(&record.actual_salary, &record.profit_percentage);
    }
}

/// Formats like a JavaScript number's `toString` for the magnitudes that
/// occur here: integers without a fraction, otherwise the shortest decimal
/// that round-trips.
pub fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Lenient numeric parse: leading whitespace is skipped and the longest
/// numeric prefix is used, so `"15%"` reads as 15. `None` if there is no
/// numeric prefix at all.
pub fn parse_leading_number(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::salary_band::{BandRates, SalaryBand};

    fn table() -> SalaryBandTable {
        SalaryBandTable::new(vec![
            SalaryBand {
                band: "B2".to_string(),
                experience_range: None,
                rates: BandRates {
                    standard: Some(2.5),
                    ra1: Some(3.0),
                    ra2: Some(0.0),
                },
            },
            SalaryBand {
                band: "6A".to_string(),
                experience_range: Some("1-3 years".to_string()),
                rates: BandRates {
                    standard: Some(310.0),
                    ra1: Some(388.0),
                    ra2: Some(403.0),
                },
            },
        ])
    }

    #[test]
    fn test_actual_salary_b2_standard() {
        assert_eq!(actual_salary("B2", "standard", &table()), "4800");
    }

    #[test]
    fn test_actual_salary_reference_band() {
        assert_eq!(actual_salary("6A", "ra1", &table()), "744960");
    }

    #[test]
    fn test_expected_package_twenty_percent() {
        assert_eq!(expected_package("4800", "20"), "3840");
    }

    #[test]
    fn test_expected_package_keeps_full_precision() {
        // 595200 * 0.155 is not exact in binary floating point.
        let expected = 595200.0 - 595200.0 * (15.5 / 100.0);
        assert_eq!(expected_package("595200", "15.5"), expected.to_string());
    }

    #[test]
    fn test_actual_salary_totality() {
        let t = table();
        assert_eq!(actual_salary("", "standard", &t), "");
        assert_eq!(actual_salary("B2", "", &t), "");
        assert_eq!(actual_salary("Z9", "standard", &t), "");
        assert_eq!(actual_salary("B2", "premium", &t), "");
        assert_eq!(actual_salary("B2", "ra2", &t), "");
        assert_eq!(actual_salary("B2", "standard", &SalaryBandTable::default()), "");
    }

    #[test]
    fn test_expected_package_totality() {
        assert_eq!(expected_package("", "20"), "");
        assert_eq!(expected_package("4800", ""), "");
        assert_eq!(expected_package("abc", "20"), "");
        assert_eq!(expected_package("4800", "twenty"), "");
    }

    #[test]
    fn test_expected_package_reads_numeric_prefix() {
        assert_eq!(expected_package("4800", "20%"), "3840");
        assert_eq!(expected_package("4800", "0"), "4800");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(4800.0), "4800");
        assert_eq!(format_decimal(0.5), "0.5");
        assert_eq!(format_decimal(-0.0), "0");
        assert_eq!(format_decimal(f64::NAN), "");
    }

    #[test]
    fn test_parse_leading_number() {
        assert_eq!(parse_leading_number(" 12.5abc"), Some(12.5));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("3."), Some(3.0));
        assert_eq!(parse_leading_number("1e3"), Some(1000.0));
        assert_eq!(parse_leading_number("2e"), Some(2.0));
        assert_eq!(parse_leading_number("-4"), Some(-4.0));
        assert_eq!(parse_leading_number("."), None);
        assert_eq!(parse_leading_number("-"), None);
        assert_eq!(parse_leading_number("x1"), None);
    }

    #[test]
    fn test_compute_derived_discards_supplied_values() {
        let record = NormalizedJobRecord {
            salary_band: "B2".into(),
            salary_rate: "standard".into(),
            profit_percentage: "20".into(),
            actual_salary: "1".into(),
            expected_package: "1".into(),
            ..Default::default()
        };
        let derived = compute_derived(record, &table());
        assert_eq!(derived.actual_salary, "4800");
        assert_eq!(derived.expected_package, "3840");

        let no_rate = NormalizedJobRecord {
            salary_band: "B2".into(),
            actual_salary: "9999".into(),
            ..Default::default()
        };
        assert_eq!(compute_derived(no_rate, &table()).actual_salary, "");
    }

    #[test]
    fn test_profit_before_band_and_rate_leaves_package_empty() {
        let t = table();
        let record = apply_edit(
            &NormalizedJobRecord::default(),
            CompensationEdit::ProfitPercentage("20".into()),
            &t,
        );
        assert_eq!(record.profit_percentage, "20");
        assert_eq!(record.actual_salary, "");
        assert_eq!(record.expected_package, "");
    }

    #[test]
    fn test_band_then_rate_picks_up_earlier_profit() {
        let t = table();
        let record = apply_edit(
            &NormalizedJobRecord::default(),
            CompensationEdit::ProfitPercentage("20".into()),
            &t,
        );
        let record = apply_edit(&record, CompensationEdit::SalaryBand("B2".into()), &t);
        assert_eq!(record.actual_salary, "");
        let record = apply_edit(&record, CompensationEdit::SalaryRate("Standard".into()), &t);
        assert_eq!(record.salary_rate, "standard");
        assert_eq!(record.actual_salary, "4800");
        assert_eq!(record.expected_package, "3840");
    }

    #[test]
    fn test_profit_edit_uses_existing_salary() {
        let t = table();
        let base = compute_derived(
            NormalizedJobRecord {
                salary_band: "B2".into(),
                salary_rate: "standard".into(),
                ..Default::default()
            },
            &t,
        );
        assert_eq!(base.expected_package, "");
        let edited = apply_edit(&base, CompensationEdit::ProfitPercentage("50".into()), &t);
        assert_eq!(edited.actual_salary, "4800");
        assert_eq!(edited.expected_package, "2400");
    }

    #[test]
    fn test_band_change_recomputes_both() {
        let t = table();
        let base = compute_derived(
            NormalizedJobRecord {
                salary_band: "B2".into(),
                salary_rate: "ra1".into(),
                profit_percentage: "10".into(),
                ..Default::default()
            },
            &t,
        );
        assert_eq!(base.actual_salary, "5760");
        let edited = apply_edit(&base, CompensationEdit::SalaryBand("6A".into()), &t);
        assert_eq!(edited.actual_salary, "744960");
        assert_eq!(edited.expected_package, "670464");
    }

    #[test]
    fn test_edit_to_unknown_band_clears_derived() {
        let t = table();
        let base = compute_derived(
            NormalizedJobRecord {
                salary_band: "B2".into(),
                salary_rate: "standard".into(),
                profit_percentage: "20".into(),
                ..Default::default()
            },
            &t,
        );
        let edited = apply_edit(&base, CompensationEdit::SalaryBand("ZZ".into()), &t);
        assert_eq!(edited.actual_salary, "");
        assert_eq!(edited.expected_package, "");
    }

    #[test]
    fn test_apply_edit_leaves_original_untouched() {
        let t = table();
        let base = NormalizedJobRecord::default();
        let _ = apply_edit(&base, CompensationEdit::SalaryBand("B2".into()), &t);
        assert_eq!(base, NormalizedJobRecord::default());
    }

    #[test]
    fn test_edit_wire_shape() {
        let edit: CompensationEdit =
            serde_json::from_str(r#"{"field":"salary_rate","value":"ra2"}"#).unwrap();
        assert_eq!(edit, CompensationEdit::SalaryRate("ra2".into()));
    }
}
