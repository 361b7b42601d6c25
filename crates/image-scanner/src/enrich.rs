//! 이미지 부가 정보 수집 단계
//!
//! 탐색이 끝난 뒤 고유 이미지마다 크기(바이트)와 패키지 수를 구합니다.
//! 실패한 값은 0이 아니라 "알 수 없음"(`None`)으로 남고, 리포트에서는 `N/A`로 표시됩니다.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use helmscan_core::metrics as m;

use crate::runner::CommandRunner;
use crate::types::BoxFuture;

/// 부가 정보 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichStage {
    /// 이미지 크기 (바이트)
    Size,
    /// 패키지 수
    Packages,
}

impl EnrichStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Packages => "packages",
        }
    }
}

impl fmt::Display for EnrichStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이미지 하나에 대한 부가 정보 수집기
pub trait Enricher: Send + Sync {
    /// 수집하는 정보 종류
    fn stage(&self) -> EnrichStage;

    /// 값을 구합니다. 실패하면 `None`.
    fn enrich<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Option<u64>>;
}

/// `docker image inspect`로 이미지 크기를 구합니다.
pub struct DockerSizeEnricher<R> {
    runner: R,
    binary: String,
}

impl<R: CommandRunner> DockerSizeEnricher<R> {
    pub fn new(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    async fn image_size(&self, image: &str) -> Option<u64> {
        let args = vec![
            "image".to_owned(),
            "inspect".to_owned(),
            "--format".to_owned(),
            "{{.Size}}".to_owned(),
            image.to_owned(),
        ];
        let stdout = run_stage(&self.runner, &self.binary, &args, EnrichStage::Size, image).await?;
        let parsed = stdout.trim().parse::<u64>();
        match parsed {
            Ok(size) => Some(size),
            Err(e) => {
                stage_failed(EnrichStage::Size, image, &format!("unexpected size '{}': {e}", stdout.trim()));
                None
            }
        }
    }
}

impl<R: CommandRunner> Enricher for DockerSizeEnricher<R> {
    fn stage(&self) -> EnrichStage {
        EnrichStage::Size
    }

    fn enrich<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Option<u64>> {
        Box::pin(self.image_size(image))
    }
}

#[derive(Debug, Deserialize)]
struct SyftDocument {
    #[serde(default)]
    artifacts: Option<Vec<serde_json::Value>>,
}

/// `syft <image> -o json`의 `artifacts` 개수로 패키지 수를 구합니다.
pub struct SyftPackageEnricher<R> {
    runner: R,
    binary: String,
}

impl<R: CommandRunner> SyftPackageEnricher<R> {
    pub fn new(runner: R, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    async fn package_count(&self, image: &str) -> Option<u64> {
        let args = vec![image.to_owned(), "-o".to_owned(), "json".to_owned()];
        let stdout =
            run_stage(&self.runner, &self.binary, &args, EnrichStage::Packages, image).await?;
        match serde_json::from_str::<SyftDocument>(&stdout) {
            Ok(doc) => Some(doc.artifacts.map_or(0, |a| a.len() as u64)),
            Err(e) => {
                stage_failed(EnrichStage::Packages, image, &format!("malformed syft output: {e}"));
                None
            }
        }
    }
}

impl<R: CommandRunner> Enricher for SyftPackageEnricher<R> {
    fn stage(&self) -> EnrichStage {
        EnrichStage::Packages
    }

    fn enrich<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Option<u64>> {
        Box::pin(self.package_count(image))
    }
}

async fn run_stage<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[String],
    stage: EnrichStage,
    image: &str,
) -> Option<String> {
    let output = match runner.run(program, args).await {
        Ok(output) => output,
        Err(e) => {
            stage_failed(stage, image, &format!("{program}: {e}"));
            return None;
        }
    };
    if !output.success {
        stage_failed(
            stage,
            image,
            &format!("{program} {}: {}", output.status_display(), output.stderr_str()),
        );
        return None;
    }
    debug!(image, stage = %stage, "enrichment command finished");
    Some(output.stdout_str().into_owned())
}

/// 수집기를 실행하되 시간 제한과 실행 취소를 적용합니다.
///
/// 제한 시간을 넘기거나 실행이 취소되면 `None`을 반환하며, 수집기 future는 drop됩니다
/// (외부 프로세스는 `kill_on_drop`으로 종료).
pub async fn enrich_or_unavailable(
    enricher: &dyn Enricher,
    image: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Option<u64> {
    let stage = enricher.stage();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(image, stage = %stage, "enrichment skipped, run cancelled");
            None
        }
        result = tokio::time::timeout(timeout, enricher.enrich(image)) => match result {
            Ok(value) => value,
            Err(_) => {
                stage_failed(
                    stage,
                    image,
                    &format!("timed out after {}s", timeout.as_secs()),
                );
                None
            }
        },
    }
}

fn stage_failed(stage: EnrichStage, image: &str, reason: &str) {
    warn!(image, stage = %stage, reason, "enrichment unavailable");
    metrics::counter!(m::ENRICHMENT_FAILURES_TOTAL, m::LABEL_STAGE => stage.as_str()).increment(1);
}
