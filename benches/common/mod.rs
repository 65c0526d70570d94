pub mod config;
pub mod fixtures;

pub use config::BenchConfig;
pub use fixtures::{QuarterlyReport, ReportSource, report_keys, skewed_keys};
