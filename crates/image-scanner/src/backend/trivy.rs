//! trivy 백엔드
//!
//! `trivy image <image> --format json [--skip-db-update]` 출력에서
//! `Results[].Vulnerabilities[]`를 모두 이어 붙여 finding으로 사용합니다.
//! `Vulnerabilities`가 `null`인 결과는 빈 목록으로 취급합니다.
//! 심각도는 `Severity` 필드에 대문자(`HIGH`)로 들어 있습니다.

use serde::Deserialize;

use helmscan_core::error::ScanError;

use super::{ScanBackend, run_scanner};
use crate::runner::CommandRunner;
use crate::types::{BoxFuture, RawFinding};

/// 백엔드 이름
pub const NAME: &str = "trivy";

#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Option<Vec<TrivyResult>>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Option<Vec<serde_json::Value>>,
}

/// trivy CLI 백엔드
pub struct TrivyBackend<R> {
    runner: R,
    binary: String,
    skip_db_update: bool,
}

impl<R: CommandRunner> TrivyBackend<R> {
    /// `trivy`를 PATH에서 찾고 DB 업데이트를 건너뛰는 백엔드를 생성합니다.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            binary: NAME.to_owned(),
            skip_db_update: true,
        }
    }

    /// 실행 파일 경로를 지정합니다.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// 취약점 DB 업데이트 생략 여부를 지정합니다.
    pub fn skip_db_update(mut self, skip: bool) -> Self {
        self.skip_db_update = skip;
        self
    }

    /// 스캔 인자 목록
    pub fn args(&self, image: &str) -> Vec<String> {
        let mut args = vec![
            "image".to_owned(),
            image.to_owned(),
            "--format".to_owned(),
            "json".to_owned(),
        ];
        if self.skip_db_update {
            args.push("--skip-db-update".to_owned());
        }
        args
    }

    async fn scan_image(&self, image: &str) -> Result<Vec<RawFinding>, ScanError> {
        let stdout = run_scanner(&self.runner, NAME, &self.binary, &self.args(image)).await?;
        parse_output(&stdout)
    }
}

impl<R: CommandRunner> ScanBackend for TrivyBackend<R> {
    fn name(&self) -> &str {
        NAME
    }

    fn scan<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<Vec<RawFinding>, ScanError>> {
        Box::pin(self.scan_image(image))
    }

    fn severity_label<'a>(&self, finding: &'a RawFinding) -> Option<&'a str> {
        finding.str_at(&["Severity"])
    }
}

/// trivy JSON 출력을 finding 목록으로 변환합니다.
pub fn parse_output(stdout: &str) -> Result<Vec<RawFinding>, ScanError> {
    let report: TrivyReport =
        serde_json::from_str(stdout).map_err(|e| ScanError::MalformedOutput {
            backend: NAME.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(report
        .results
        .unwrap_or_default()
        .into_iter()
        .flat_map(|result| result.vulnerabilities.unwrap_or_default())
        .map(RawFinding::new)
        .collect())
}
