use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rate keys a band carries a multiplier for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryRate {
    Standard,
    Ra1,
    Ra2,
}

impl SalaryRate {
    pub const ALL: [SalaryRate; 3] = [SalaryRate::Standard, SalaryRate::Ra1, SalaryRate::Ra2];

    pub fn as_str(&self) -> &'static str {
        match self {
            SalaryRate::Standard => "standard",
            SalaryRate::Ra1 => "ra1",
            SalaryRate::Ra2 => "ra2",
        }
    }
}

impl fmt::Display for SalaryRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SalaryRate {
    type Err = ();

    /// Exact, lowercase match only. Rate cells are lowercased during normalization.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(SalaryRate::Standard),
            "ra1" => Ok(SalaryRate::Ra1),
            "ra2" => Ok(SalaryRate::Ra2),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandRates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ra1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ra2: Option<f64>,
}

impl BandRates {
    pub fn get(&self, rate: SalaryRate) -> Option<f64> {
        match rate {
            SalaryRate::Standard => self.standard,
            SalaryRate::Ra1 => self.ra1,
            SalaryRate::Ra2 => self.ra2,
        }
    }
}

/// One row of the reference band table as served by the record server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBand {
    pub band: String,
    #[serde(default)]
    pub experience_range: Option<String>,
    #[serde(default)]
    pub rates: BandRates,
}

/// Read-only band lookup, fetched once and shared.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SalaryBandTable {
    bands: Vec<SalaryBand>,
}

impl SalaryBandTable {
    pub fn new(bands: Vec<SalaryBand>) -> Self {
        Self { bands }
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// Band names are matched exactly, first entry wins.
    pub fn find(&self, band: &str) -> Option<&SalaryBand> {
        self.bands.iter().find(|b| b.band == band)
    }

    /// Multiplier for `band` at `rate`, if both are known.
    pub fn multiplier(&self, band: &str, rate: &str) -> Option<f64> {
        let rate = rate.parse::<SalaryRate>().ok()?;
        self.find(band)?.rates.get(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SalaryBandTable {
        SalaryBandTable::new(vec![SalaryBand {
            band: "B2".to_string(),
            experience_range: Some("3-5 years".to_string()),
            rates: BandRates {
                standard: Some(2.5),
                ra1: None,
                ra2: Some(3.0),
            },
        }])
    }

    #[test]
    fn test_multiplier_known_band_and_rate() {
        assert_eq!(table().multiplier("B2", "standard"), Some(2.5));
        assert_eq!(table().multiplier("B2", "ra2"), Some(3.0));
    }

    #[test]
    fn test_multiplier_missing_rate_value() {
        assert_eq!(table().multiplier("B2", "ra1"), None);
    }

    #[test]
    fn test_multiplier_band_is_case_sensitive() {
        assert_eq!(table().multiplier("b2", "standard"), None);
    }

    #[test]
    fn test_multiplier_unknown_rate_key() {
        assert_eq!(table().multiplier("B2", "premium"), None);
    }

    #[test]
    fn test_band_deserializes_with_partial_rates() {
        let json = r#"{"band":"8","experience_range":null,"rates":{"standard":1064}}"#;
        let band: SalaryBand = serde_json::from_str(json).unwrap();
        assert_eq!(band.rates.standard, Some(1064.0));
        assert_eq!(band.rates.ra1, None);
        assert!(band.experience_range.is_none());
    }
}
