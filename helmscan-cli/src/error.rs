//! CLI-specific error types and exit code mapping

use helmscan_core::error::HelmscanError;
use helmscan_image_scanner::ImageScannerError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The chart could not be rendered or its output could not be read.
    #[error("render error: {0}")]
    Render(String),

    /// Rendering succeeded but no container images were found.
    #[error("no container images found in chart '{0}'")]
    EmptyDiscovery(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (CSV write, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Chart render failure             |
    /// | 4    | No container images discovered   |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Render(_) => 3,
            Self::EmptyDiscovery(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<HelmscanError> for CliError {
    fn from(e: HelmscanError) -> Self {
        match e {
            HelmscanError::Config(e) => Self::Config(e.to_string()),
            HelmscanError::Render(e) => Self::Render(e.to_string()),
            HelmscanError::EmptyDiscovery { chart } => Self::EmptyDiscovery(chart),
            HelmscanError::Io(e) => Self::Io(e),
            HelmscanError::Scan(e) => Self::Command(e.to_string()),
        }
    }
}

impl From<ImageScannerError> for CliError {
    fn from(e: ImageScannerError) -> Self {
        HelmscanError::from(e).into()
    }
}
