//! Downloadable sample file operators fill in for bulk upload.

pub const TEMPLATE_FILE_NAME: &str = "sample_jobs.csv";

/// Header row only. Column names are the short aliases operators see in the
/// upload dialog ("band", "rate").
pub const SAMPLE_TEMPLATE: &str =
    "csa_id,title,description,location,band,rate,profit_percentage,start_date,end_date,priority,assigned_hr";
