//! `helmscan scan` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use helmscan_core::config::HelmscanConfig;
use helmscan_core::types::Severity;
use helmscan_image_scanner::{
    AggregateReport, ChartRequest, ChartScannerBuilder, ImageScannerConfig, ProcessRunner,
    ReportScope,
};

use crate::cli::ScanArgs;
use crate::csv::write_csv;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Fatal errors (config, render, empty discovery) abort before anything is
/// written. Per-image scan failures only show up as warnings in the report.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path, &args).await?;

    let scanner = ChartScannerBuilder::new()
        .config(ImageScannerConfig::from_core(&config))
        .builtin_components(ProcessRunner)
        .build()?;
    let request = ChartRequest::from_core(args.chart.as_str(), &config.render);

    info!(
        chart = %request.chart,
        backends = ?scanner.backend_names(),
        "starting chart scan"
    );
    let report = scanner.scan_chart(&request).await?;

    let csv_path = if config.report.write_csv {
        let path = PathBuf::from(&config.report.csv_path);
        write_csv(&report, &path).await?;
        info!(path = %path.display(), rows = report.rows.len(), "csv report written");
        Some(path.display().to_string())
    } else {
        None
    };

    writer.render(&ScanReport { report, csv_path })?;
    Ok(())
}

/// Build the effective configuration: file (or defaults), then environment, then flags.
///
/// Validation runs once, after the flags are applied, so a flag can repair an
/// invalid value from the file.
pub async fn load_config(config_path: &Path, args: &ScanArgs) -> Result<HelmscanConfig, CliError> {
    let mut config = HelmscanConfig::read_or_default(config_path).await?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Apply command-line flags on top of the loaded configuration.
///
/// Flags win over environment variables and the config file.
pub fn apply_overrides(config: &mut HelmscanConfig, args: &ScanArgs) {
    if let Some(ref namespace) = args.namespace {
        config.render.namespace = namespace.clone();
    }
    if let Some(ref release) = args.release {
        config.render.release = release.clone();
    }
    if let Some(ref values) = args.values {
        config.render.values_file = values.display().to_string();
    }
    if let Some(ref repo) = args.repo {
        config.render.repo = repo.clone();
    }
    config.render.set.extend(args.set.iter().cloned());

    if !args.backends.is_empty() {
        config.scan.backends = args.backends.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.scan.concurrency = concurrency;
    }

    if let Some(scope) = args.scope {
        config.report.scope = ReportScope::from(scope).as_str().to_owned();
    }
    if args.size {
        config.report.enrich_size = true;
    }
    if args.packages {
        config.report.enrich_packages = true;
    }
    if let Some(ref csv) = args.csv {
        config.report.csv_path = csv.display().to_string();
        config.report.write_csv = true;
    }
    if args.no_csv {
        config.report.write_csv = false;
    }
}

/// Scan command output.
#[derive(Serialize)]
pub struct ScanReport {
    #[serde(flatten)]
    pub report: AggregateReport,
    /// Path of the written CSV file, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<String>,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.report;
        writeln!(w, "Chart: {}", report.chart.bold())?;
        writeln!(w, "Backends: {}", report.backends.join(", "))?;
        writeln!(w, "Rows: {} ({} scope)", report.rows.len(), report.scope)?;
        writeln!(w)?;

        let columns = report.columns();
        let cells: Vec<Vec<String>> = report
            .rows
            .iter()
            .map(|row| row.cells(report.scope, &report.backends))
            .collect();
        write_table(w, &columns, &cells)?;
        writeln!(w)?;

        writeln!(w, "{}", "Totals".bold())?;
        let mut total_columns = vec!["Backend".to_owned()];
        total_columns.extend(Severity::ALL.iter().map(|s| s.to_string()));
        let total_rows: Vec<Vec<String>> = report
            .totals
            .iter()
            .map(|t| {
                let mut cells = vec![t.backend.clone()];
                cells.extend(Severity::ALL.iter().map(|s| t.counts.get(*s).to_string()));
                cells
            })
            .collect();
        write_table(w, &total_columns, &total_rows)?;

        for total in &report.totals {
            let summary = format!("{}: {}", total.backend, total.counts);
            if total.counts.critical > 0 || total.counts.high > 0 {
                writeln!(w, "{}", summary.red().bold())?;
            } else {
                writeln!(w, "{}", summary.green())?;
            }
        }

        if !report.warnings.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", format!("Warnings ({})", report.warnings.len()).yellow())?;
            for warning in &report.warnings {
                let scope = if warning.scope_path.is_empty() {
                    String::new()
                } else {
                    format!("{} ", warning.scope_path.join("/"))
                };
                writeln!(
                    w,
                    "  {}{} [{}]: {}",
                    scope, warning.image, warning.backend, warning.message
                )?;
            }
        }

        if let Some(ref path) = self.csv_path {
            writeln!(w)?;
            writeln!(w, "CSV report: {path}")?;
        }

        Ok(())
    }
}

fn write_table(w: &mut dyn Write, columns: &[String], rows: &[Vec<String>]) -> std::io::Result<()> {
    use colored::Colorize;

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let header = columns
        .iter()
        .zip(&widths)
        .map(|(c, width)| format!("{c:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(w, "{}", header.trim_end().bold())?;
    writeln!(w, "{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)))?;

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(c, width)| format!("{c:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}
