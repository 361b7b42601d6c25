#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ImageScannerError`, `WalkError`)
//! - [`config`]: Scanner configuration (`ImageScannerConfig`, builder)
//! - [`types`]: Domain types (`RawFinding`, `NormalizedFinding`, `ReportScope`, `BackendCounts`)
//! - [`runner`]: Out-of-process execution (`CommandRunner` trait, `ProcessRunner`)
//! - [`render`]: Chart rendering (`ChartRequest`, `ChartRenderer` trait, `HelmRenderer`)
//! - [`walker`]: Image discovery in rendered manifests (`extract_images`, `WorkloadShape`)
//! - [`backend`]: Scanner adapter (`ScanBackend` trait, `scan_or_empty`, grype, trivy)
//! - [`normalize`]: Severity normalization
//! - [`aggregate`]: Per-row / per-backend counting (`Aggregator`)
//! - [`enrich`]: Optional image size / package count stages (`Enricher` trait)
//! - [`report`]: Report model (`AggregateReport`, `report_columns`)
//! - [`scanner`]: Main orchestrator (`ChartScanner`, `ChartScannerBuilder`)

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod enrich;
pub mod error;
pub mod normalize;
pub mod render;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod types;
pub mod walker;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{ChartScanner, ChartScannerBuilder};

// Configuration
pub use config::{ImageScannerConfig, ImageScannerConfigBuilder};

// Error
pub use error::{ImageScannerError, WalkError};

// Types
pub use types::{BackendCounts, NormalizedFinding, RawFinding, ReportScope};

// Rendering / process execution
pub use render::{ChartRenderer, ChartRequest, HelmRenderer};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

// Pipeline stages
pub use aggregate::Aggregator;
pub use backend::{GrypeBackend, ScanBackend, ScanOutcome, ScanPolicy, TrivyBackend, scan_or_empty};
pub use enrich::{
    DockerSizeEnricher, EnrichStage, Enricher, SyftPackageEnricher, enrich_or_unavailable,
};
pub use normalize::{normalize, normalize_all};
pub use report::{AggregateReport, ReportRow, ScanWarning, report_columns};
pub use walker::{WorkloadShape, extract_images, unique_images};
