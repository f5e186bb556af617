//! JSON report.

use crate::coordinator::RunReport;
use crate::error::Result;
use std::io::Write;

/// Write the run report as one pretty JSON document followed by a newline.
pub fn write_json<W: Write>(report: &RunReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Print the run report as pretty JSON on stdout.
pub fn print_json(report: &RunReport) -> Result<()> {
    write_json(report, std::io::stdout().lock())
}
