pub mod job;
pub mod salary_band;
