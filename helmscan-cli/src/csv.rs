//! CSV report sink
//!
//! One header line followed by one line per report row, in report order.
//! Fields are quoted only when they contain a comma, quote or line break
//! (RFC 4180). Unknown size / package values are written as `N/A`.

use std::path::Path;

use helmscan_image_scanner::AggregateReport;

use crate::error::CliError;

/// Render the report as CSV text.
pub fn render_csv(report: &AggregateReport) -> String {
    let mut out = String::new();
    push_record(&mut out, &report.columns());
    for row in &report.rows {
        push_record(&mut out, &row.cells(report.scope, &report.backends));
    }
    out
}

/// Write the report as CSV to `path`, replacing any existing file.
pub async fn write_csv(report: &AggregateReport, path: &Path) -> Result<(), CliError> {
    tokio::fs::write(path, render_csv(report)).await?;
    Ok(())
}

fn push_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push('\n');
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
