use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical fields of a job record, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    CsaId,
    Title,
    Description,
    Location,
    SalaryBand,
    SalaryRate,
    ProfitPercentage,
    ActualSalary,
    ExpectedPackage,
    Priority,
    StartDate,
    EndDate,
    AssignedHr,
}

impl JobField {
    pub const ALL: [JobField; 13] = [
        JobField::CsaId,
        JobField::Title,
        JobField::Description,
        JobField::Location,
        JobField::SalaryBand,
        JobField::SalaryRate,
        JobField::ProfitPercentage,
        JobField::ActualSalary,
        JobField::ExpectedPackage,
        JobField::Priority,
        JobField::StartDate,
        JobField::EndDate,
        JobField::AssignedHr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobField::CsaId => "csa_id",
            JobField::Title => "title",
            JobField::Description => "description",
            JobField::Location => "location",
            JobField::SalaryBand => "salary_band",
            JobField::SalaryRate => "salary_rate",
            JobField::ProfitPercentage => "profit_percentage",
            JobField::ActualSalary => "actual_salary",
            JobField::ExpectedPackage => "expected_package",
            JobField::Priority => "priority",
            JobField::StartDate => "start_date",
            JobField::EndDate => "end_date",
            JobField::AssignedHr => "assigned_hr",
        }
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One job posting after column normalization.
///
/// Every field is a string; an unset field is `""`. `actual_salary` and
/// `expected_package` are derived and only ever written by the compensation
/// calculator. This is also the wire shape of a job in submission requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedJobRecord {
    pub csa_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary_band: String,
    pub salary_rate: String,
    pub profit_percentage: String,
    pub actual_salary: String,
    pub expected_package: String,
    pub priority: String,
    pub start_date: String,
    pub end_date: String,
    pub assigned_hr: String,
}

impl NormalizedJobRecord {
    pub fn get(&self, field: JobField) -> &str {
        match field {
            JobField::CsaId => &self.csa_id,
            JobField::Title => &self.title,
            JobField::Description => &self.description,
            JobField::Location => &self.location,
            JobField::SalaryBand => &self.salary_band,
            JobField::SalaryRate => &self.salary_rate,
            JobField::ProfitPercentage => &self.profit_percentage,
            JobField::ActualSalary => &self.actual_salary,
            JobField::ExpectedPackage => &self.expected_package,
            JobField::Priority => &self.priority,
            JobField::StartDate => &self.start_date,
            JobField::EndDate => &self.end_date,
            JobField::AssignedHr => &self.assigned_hr,
        }
    }

    fn slot(&mut self, field: JobField) -> &mut String {
        match field {
            JobField::CsaId => &mut self.csa_id,
            JobField::Title => &mut self.title,
            JobField::Description => &mut self.description,
            JobField::Location => &mut self.location,
            JobField::SalaryBand => &mut self.salary_band,
            JobField::SalaryRate => &mut self.salary_rate,
            JobField::ProfitPercentage => &mut self.profit_percentage,
            JobField::ActualSalary => &mut self.actual_salary,
            JobField::ExpectedPackage => &mut self.expected_package,
            JobField::Priority => &mut self.priority,
            JobField::StartDate => &mut self.start_date,
            JobField::EndDate => &mut self.end_date,
            JobField::AssignedHr => &mut self.assigned_hr,
        }
    }

    /// Builder-style setter used by the normalizer and the edit path.
    pub fn with(mut self, field: JobField, value: impl Into<String>) -> Self {
        *self.slot(field) = value.into();
        self
    }

    /// `(canonical name, value)` pairs in schema order.
    #[cfg(test)]
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        JobField::ALL.iter().map(move |f| (f.name(), self.get(*f)))
    }
}
