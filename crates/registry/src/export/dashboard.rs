//! Dashboard output.

use std::io::Write;

use crate::error::Result;
use crate::stats::AggregateReport;

/// Serialize a report as the dashboard JSON object.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(report: &AggregateReport, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    Ok(json)
}

/// Write the dashboard JSON object followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(mut out: W, report: &AggregateReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}
