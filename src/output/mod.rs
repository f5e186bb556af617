//! Report rendering.

pub mod json;
pub mod plain;

use crate::coordinator::{Preparation, RunReport};
use crate::error::Result;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable sections (default).
    #[default]
    Plain,
    /// One JSON document on stdout.
    Json,
}

/// Print the pre-fork summary. JSON output folds it into the final report.
pub fn print_preparation(prep: &Preparation, format: OutputFormat) {
    if format == OutputFormat::Plain {
        print!("{}", plain::render_preparation(prep));
    }
}

/// Print the final report.
pub fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            print!("{}", plain::render_report(report));
            Ok(())
        }
        OutputFormat::Json => json::print_json(report),
    }
}
