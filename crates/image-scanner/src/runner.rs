//! Out-of-process command execution.
//!
//! The [`CommandRunner`] trait is the single seam through which the renderer,
//! scanner backends and enrichers launch external tools (`helm`, `grype`,
//! `trivy`, `docker`, `syft`). Production code uses [`ProcessRunner`]; tests
//! supply canned outputs.
//!
//! # Architecture
//!
//! ```text
//!   HelmRenderer   GrypeBackend   TrivyBackend   Enrichers
//!        │              │              │             │
//!        └──────────────┴──────┬───────┴─────────────┘
//!                              ▼
//!                      ┌───────────────┐
//!                      │ CommandRunner │ (trait)
//!                      └───────────────┘
//!                         │         │
//!                         ▼         ▼
//!                 ProcessRunner   test runners
//! ```
//!
//! # Cancellation
//!
//! Children spawned by [`ProcessRunner`] are killed when the returned future is
//! dropped, so wrapping a call in `tokio::time::timeout` or racing it against a
//! cancellation token never leaves a stray scanner process behind.

use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Raw standard output.
    pub stdout: Vec<u8>,
    /// Raw standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(code),
            success: false,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Standard output decoded as UTF-8 (lossy).
    pub fn stdout_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Standard error decoded as UTF-8 (lossy) and trimmed.
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_owned()
    }

    /// Human-readable exit status.
    pub fn status_display(&self) -> String {
        match self.status {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_owned(),
        }
    }
}

/// Trait abstracting external command execution.
///
/// Implementations must be `Send + Sync + 'static` so one runner can be shared
/// by every concurrent scan task.
///
/// # Errors
///
/// Returns `io::Error` only when the process could not be spawned or waited on
/// (e.g. binary not found). A non-zero exit is reported through
/// [`CommandOutput::success`], not as an error.
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs `program` with `args` and captures its output.
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<CommandOutput>> + Send;
}

impl<R: CommandRunner> CommandRunner for Arc<R> {
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<CommandOutput>> + Send {
        (**self).run(program, args)
    }
}

/// Production runner backed by `tokio::process`.
///
/// Stdin is closed; stdout and stderr are captured in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        debug!(program, ?args, "spawning process");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
