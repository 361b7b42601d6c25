//! grype 백엔드
//!
//! `grype <image> -o json` 출력의 `matches[]`를 finding으로 사용하며,
//! 심각도는 `vulnerability.severity`에 있습니다.

use serde::Deserialize;

use helmscan_core::error::ScanError;

use super::{ScanBackend, run_scanner};
use crate::runner::CommandRunner;
use crate::types::{BoxFuture, RawFinding};

/// 백엔드 이름
pub const NAME: &str = "grype";

#[derive(Debug, Deserialize)]
struct GrypeDocument {
    #[serde(default)]
    matches: Option<Vec<serde_json::Value>>,
}

/// grype CLI 백엔드
pub struct GrypeBackend<R> {
    runner: R,
    binary: String,
}

impl<R: CommandRunner> GrypeBackend<R> {
    /// `grype`를 PATH에서 찾는 백엔드를 생성합니다.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            binary: NAME.to_owned(),
        }
    }

    /// 실행 파일 경로를 지정합니다.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// 스캔 인자 목록
    pub fn args(image: &str) -> Vec<String> {
        vec![image.to_owned(), "-o".to_owned(), "json".to_owned()]
    }

    async fn scan_image(&self, image: &str) -> Result<Vec<RawFinding>, ScanError> {
        let stdout = run_scanner(&self.runner, NAME, &self.binary, &Self::args(image)).await?;
        parse_output(&stdout)
    }
}

impl<R: CommandRunner> ScanBackend for GrypeBackend<R> {
    fn name(&self) -> &str {
        NAME
    }

    fn scan<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<Vec<RawFinding>, ScanError>> {
        Box::pin(self.scan_image(image))
    }

    fn severity_label<'a>(&self, finding: &'a RawFinding) -> Option<&'a str> {
        finding.str_at(&["vulnerability", "severity"])
    }
}

/// grype JSON 출력을 finding 목록으로 변환합니다.
///
/// `matches`가 없거나 `null`이면 빈 목록입니다.
pub fn parse_output(stdout: &str) -> Result<Vec<RawFinding>, ScanError> {
    let document: GrypeDocument =
        serde_json::from_str(stdout).map_err(|e| ScanError::MalformedOutput {
            backend: NAME.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(document
        .matches
        .unwrap_or_default()
        .into_iter()
        .map(RawFinding::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::runner::CommandOutput;

    struct CannedRunner(CommandOutput);

    impl CommandRunner for CannedRunner {
        async fn run(&self, _program: &str, _args: &[String]) -> io::Result<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    const SAMPLE: &str = r#"{
      "matches": [
        {"vulnerability": {"id": "CVE-2023-0001", "severity": "Critical"}, "artifact": {"name": "openssl"}},
        {"vulnerability": {"id": "CVE-2023-0002", "severity": "Negligible"}, "artifact": {"name": "zlib"}},
        {"vulnerability": {"id": "CVE-2023-0003"}, "artifact": {"name": "curl"}}
      ],
      "source": {"type": "image"}
    }"#;

    #[test]
    fn args_request_json_output() {
        assert_eq!(
            GrypeBackend::<CannedRunner>::args("nginx:1.25"),
            vec!["nginx:1.25", "-o", "json"]
        );
    }

    #[test]
    fn parse_sample_output() {
        let findings = parse_output(SAMPLE).unwrap();
        assert_eq!(findings.len(), 3);

        let backend = GrypeBackend::new(CannedRunner(CommandOutput::default()));
        assert_eq!(backend.severity_label(&findings[0]), Some("Critical"));
        assert_eq!(backend.severity_label(&findings[1]), Some("Negligible"));
        assert_eq!(backend.severity_label(&findings[2]), None);
    }

    #[test]
    fn missing_or_null_matches_is_empty() {
        assert!(parse_output("{}").unwrap().is_empty());
        assert!(parse_output(r#"{"matches": null}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_output_is_error() {
        let err = parse_output("not json").unwrap_err();
        assert!(matches!(err, ScanError::MalformedOutput { .. }));
        assert_eq!(err.backend(), "grype");
    }

    #[tokio::test]
    async fn scan_runs_binary_and_parses() {
        let backend = GrypeBackend::new(CannedRunner(CommandOutput::success(SAMPLE)));
        let findings = backend.scan("app:1").await.unwrap();
        assert_eq!(findings.len(), 3);
    }

    #[tokio::test]
    async fn empty_stdout_is_error() {
        let backend = GrypeBackend::new(CannedRunner(CommandOutput::success("  \n")));
        let err = backend.scan("app:1").await.unwrap_err();
        assert!(matches!(err, ScanError::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let backend = GrypeBackend::new(CannedRunner(CommandOutput::failure(
            1,
            "failed to pull image",
        )));
        let err = backend.scan("private/app:1").await.unwrap_err();
        match err {
            ScanError::NonZeroExit { stderr, .. } => assert!(stderr.contains("pull")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
