//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use helmscan_image_scanner::ReportScope;

/// helmscan -- render a Helm chart and scan every referenced container image.
///
/// Use `helmscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "helmscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to the helmscan.toml configuration file (missing file = defaults).
    #[arg(short, long, global = true, default_value = "helmscan.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a chart and scan its container images.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Render a chart with `helm template` and scan every discovered image.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Chart reference (local path or chart name).
    pub chart: String,

    /// Namespace passed to `helm template`.
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Release name passed to `helm template`.
    #[arg(short, long)]
    pub release: Option<String>,

    /// Values overlay file.
    #[arg(short = 'f', long = "values")]
    pub values: Option<PathBuf>,

    /// Remote chart repository URL.
    #[arg(long)]
    pub repo: Option<String>,

    /// Value override (`key=value`), repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Scanner backend, repeatable (default from config: grype).
    #[arg(long = "backend", value_parser = ["grype", "trivy"])]
    pub backends: Vec<String>,

    /// Report granularity.
    #[arg(long)]
    pub scope: Option<ScopeArg>,

    /// Maximum number of concurrent scans (1-64).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Collect image sizes with `docker image inspect`.
    #[arg(long)]
    pub size: bool,

    /// Count packages with `syft`.
    #[arg(long)]
    pub packages: bool,

    /// CSV report path (default from config: helmscan-report.csv).
    #[arg(long, conflicts_with = "no_csv")]
    pub csv: Option<PathBuf>,

    /// Do not write a CSV report.
    #[arg(long)]
    pub no_csv: bool,
}

/// Report granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// One row per workload container.
    Container,
    /// One row per unique image.
    Image,
}

impl From<ScopeArg> for ReportScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Container => ReportScope::Container,
            ScopeArg::Image => ReportScope::Image,
        }
    }
}

// ---- config ----

/// Manage helmscan configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, render, scan, report).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["helmscan", "scan", "./charts/api"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from("helmscan.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.chart, "./charts/api");
                assert!(args.namespace.is_none());
                assert!(args.release.is_none());
                assert!(args.backends.is_empty());
                assert!(args.set.is_empty());
                assert!(!args.size);
                assert!(!args.no_csv);
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_all_flags() {
        let cli = Cli::try_parse_from([
            "helmscan",
            "scan",
            "nginx",
            "-n",
            "web",
            "-r",
            "audit",
            "-f",
            "values-prod.yaml",
            "--repo",
            "https://charts.example.com",
            "--set",
            "image.tag=1.25",
            "--set",
            "replicaCount=2",
            "--backend",
            "grype",
            "--backend",
            "trivy",
            "--scope",
            "image",
            "--concurrency",
            "8",
            "--size",
            "--packages",
            "--csv",
            "out.csv",
        ])
        .expect("parse");
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.namespace.as_deref(), Some("web"));
                assert_eq!(args.release.as_deref(), Some("audit"));
                assert_eq!(args.values, Some(PathBuf::from("values-prod.yaml")));
                assert_eq!(args.repo.as_deref(), Some("https://charts.example.com"));
                assert_eq!(args.set, vec!["image.tag=1.25", "replicaCount=2"]);
                assert_eq!(args.backends, vec!["grype", "trivy"]);
                assert_eq!(args.scope, Some(ScopeArg::Image));
                assert_eq!(args.concurrency, Some(8));
                assert!(args.size && args.packages);
                assert_eq!(args.csv, Some(PathBuf::from("out.csv")));
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        let result = Cli::try_parse_from(["helmscan", "scan", "chart", "--backend", "clair"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_csv_conflicts_with_no_csv() {
        let result =
            Cli::try_parse_from(["helmscan", "scan", "chart", "--csv", "a.csv", "--no-csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_scan_requires_chart() {
        assert!(Cli::try_parse_from(["helmscan", "scan"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["helmscan", "config", "show", "--section", "scan"])
            .expect("parse");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("scan")),
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "helmscan",
            "config",
            "validate",
            "-c",
            "/etc/helmscan.toml",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cli.config, PathBuf::from("/etc/helmscan.toml"));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_scope_arg_into_report_scope() {
        assert_eq!(ReportScope::from(ScopeArg::Image), ReportScope::Image);
        assert_eq!(ReportScope::from(ScopeArg::Container), ReportScope::Container);
    }
}
