//! 차트 렌더링 -- `helm template` 실행
//!
//! 렌더링은 실행당 한 번만 수행되며, 어떤 실패든 치명적입니다
//! ([`RenderError`]). 렌더링 결과 문자열은 그대로 워커에 전달됩니다.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use helmscan_core::config::{RenderConfig, validate_set_entry};
use helmscan_core::error::RenderError;
use helmscan_core::metrics as m;

use crate::error::ImageScannerError;
use crate::runner::CommandRunner;
use crate::types::BoxFuture;

/// 기본 릴리스 이름
pub const DEFAULT_RELEASE: &str = "scan-release";

/// 기본 네임스페이스
pub const DEFAULT_NAMESPACE: &str = "default";

/// 렌더링할 차트와 파라미터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    /// 차트 경로 또는 이름
    pub chart: String,
    /// 릴리스 이름
    pub release: String,
    /// 네임스페이스
    pub namespace: String,
    /// values 오버레이 파일
    pub values_file: Option<PathBuf>,
    /// 원격 저장소 URL
    pub repo: Option<String>,
    /// `key=value` 오버라이드
    pub set: Vec<String>,
}

impl ChartRequest {
    /// 기본 릴리스/네임스페이스로 요청을 생성합니다.
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            release: DEFAULT_RELEASE.to_owned(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            values_file: None,
            repo: None,
            set: Vec::new(),
        }
    }

    /// core의 `RenderConfig`에서 요청을 생성합니다.
    ///
    /// 빈 문자열인 `values_file`/`repo`는 지정하지 않은 것으로 봅니다.
    pub fn from_core(chart: impl Into<String>, render: &RenderConfig) -> Self {
        Self {
            chart: chart.into(),
            release: render.release.clone(),
            namespace: render.namespace.clone(),
            values_file: non_empty(&render.values_file).map(PathBuf::from),
            repo: non_empty(&render.repo).map(str::to_owned),
            set: render.set.clone(),
        }
    }

    /// 요청 값을 검증합니다.
    pub fn validate(&self) -> Result<(), ImageScannerError> {
        if self.chart.trim().is_empty() {
            return Err(ImageScannerError::Config {
                field: "chart".to_owned(),
                reason: "chart reference must not be empty".to_owned(),
            });
        }
        if self.release.trim().is_empty() {
            return Err(ImageScannerError::Config {
                field: "release".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.namespace.trim().is_empty() {
            return Err(ImageScannerError::Config {
                field: "namespace".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        for entry in &self.set {
            validate_set_entry(entry).map_err(|e| ImageScannerError::Config {
                field: "set".to_owned(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// `helm` 인자 목록을 만듭니다.
    ///
    /// `template <release> <chart> --namespace <ns> [--repo URL] [-f FILE] [--set k=v]...`
    pub fn helm_args(&self) -> Vec<String> {
        let mut args = vec![
            "template".to_owned(),
            self.release.clone(),
            self.chart.clone(),
            "--namespace".to_owned(),
            self.namespace.clone(),
        ];
        if let Some(repo) = &self.repo {
            args.push("--repo".to_owned());
            args.push(repo.clone());
        }
        if let Some(values) = &self.values_file {
            args.push("-f".to_owned());
            args.push(values.display().to_string());
        }
        for entry in &self.set {
            args.push("--set".to_owned());
            args.push(entry.clone());
        }
        args
    }
}

/// 차트를 매니페스트 문자열로 렌더링하는 trait
pub trait ChartRenderer: Send + Sync {
    /// 차트를 렌더링합니다.
    fn render<'a>(&'a self, request: &'a ChartRequest) -> BoxFuture<'a, Result<String, RenderError>>;
}

/// `helm template` 기반 렌더러
pub struct HelmRenderer<R> {
    runner: R,
    helm_binary: String,
    timeout: Duration,
}

impl<R: CommandRunner> HelmRenderer<R> {
    /// 새 렌더러를 생성합니다.
    pub fn new(runner: R, helm_binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            helm_binary: helm_binary.into(),
            timeout,
        }
    }

    /// 차트를 렌더링하고 stdout을 반환합니다.
    pub async fn render_chart(&self, request: &ChartRequest) -> Result<String, RenderError> {
        let args = request.helm_args();
        info!(
            chart = %request.chart,
            release = %request.release,
            namespace = %request.namespace,
            "rendering chart"
        );

        let result = self.run_helm(&args).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(m::CHARTS_RENDERED_TOTAL, m::LABEL_RESULT => label).increment(1);
        result
    }

    async fn run_helm(&self, args: &[String]) -> Result<String, RenderError> {
        let output = tokio::time::timeout(self.timeout, self.runner.run(&self.helm_binary, args))
            .await
            .map_err(|_| RenderError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| RenderError::Spawn {
                program: self.helm_binary.clone(),
                reason: e.to_string(),
            })?;

        if !output.success {
            return Err(RenderError::Failed {
                program: self.helm_binary.clone(),
                status: output.status_display(),
                stderr: output.stderr_str(),
            });
        }

        let manifest = String::from_utf8(output.stdout).map_err(|e| {
            RenderError::InvalidOutput(format!("rendered manifest is not valid UTF-8: {e}"))
        })?;
        debug!(bytes = manifest.len(), "chart rendered");
        Ok(manifest)
    }
}

impl<R: CommandRunner> ChartRenderer for HelmRenderer<R> {
    fn render<'a>(&'a self, request: &'a ChartRequest) -> BoxFuture<'a, Result<String, RenderError>> {
        Box::pin(self.render_chart(request))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
