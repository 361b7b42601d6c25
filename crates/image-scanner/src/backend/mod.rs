//! 스캐너 어댑터 -- 취약점 스캐너 백엔드 공통 계약
//!
//! 각 백엔드는 [`ScanBackend`]를 구현해 오케스트레이터에 등록됩니다.
//! 워커, 정규화기, 집계기는 백엔드 종류를 알지 못합니다.
//!
//! [`scan_or_empty`]는 백엔드 호출을 감싸며 절대 실패를 전파하지 않습니다.
//! 실행 실패, 0이 아닌 종료 코드, 빈 출력, 잘못된 출력, 타임아웃, 취소는 모두
//! 0건의 finding과 [`ScanError`]로 바뀌고 `warn!` 로그를 남깁니다.

pub mod grype;
pub mod trivy;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use helmscan_core::error::ScanError;

use crate::runner::{CommandOutput, CommandRunner};
use crate::types::{BoxFuture, RawFinding};

pub use grype::GrypeBackend;
pub use trivy::TrivyBackend;

/// 취약점 스캐너 백엔드
///
/// `Arc<dyn ScanBackend>`로 등록되므로 dyn-compatible하게 `BoxFuture`를 반환합니다.
pub trait ScanBackend: Send + Sync {
    /// 백엔드 이름 (리포트 컬럼과 메트릭 레이블에 사용)
    fn name(&self) -> &str;

    /// 이미지를 스캔하고 원본 finding 목록을 반환합니다.
    fn scan<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<Vec<RawFinding>, ScanError>>;

    /// finding에서 백엔드 고유 심각도 라벨을 꺼냅니다.
    fn severity_label<'a>(&self, finding: &'a RawFinding) -> Option<&'a str>;
}

/// 스캔 호출 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    /// 시도당 타임아웃
    pub timeout: Duration,
    /// 재시도 횟수 (0 = 한 번만 시도)
    pub retries: u32,
    /// 재시도 기본 대기 시간. n번째 재시도 전에 `backoff * n`만큼 기다립니다.
    pub backoff: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            retries: 0,
            backoff: Duration::from_millis(1000),
        }
    }
}

/// [`scan_or_empty`] 결과
#[derive(Debug)]
pub struct ScanOutcome {
    /// 원본 finding (실패 시 비어 있음)
    pub findings: Vec<RawFinding>,
    /// 마지막 시도의 실패 원인
    pub error: Option<ScanError>,
    /// 수행한 시도 횟수
    pub attempts: u32,
}

impl ScanOutcome {
    /// 스캔 성공 여부
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 백엔드 호출을 감싸 실패를 0건으로 바꿉니다.
///
/// `cancel`이 취소되면 진행 중인 시도를 버리고 [`ScanError::Cancelled`]를 기록합니다.
/// 재시도는 `policy.retries`만큼만 수행하며, 취소는 재시도하지 않습니다.
pub async fn scan_or_empty(
    backend: &dyn ScanBackend,
    image: &str,
    policy: &ScanPolicy,
    cancel: &CancellationToken,
) -> ScanOutcome {
    let name = backend.name();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScanError::Cancelled {
                backend: name.to_owned(),
            }),
            r = tokio::time::timeout(policy.timeout, backend.scan(image)) => match r {
                Ok(r) => r,
                Err(_) => Err(ScanError::Timeout {
                    backend: name.to_owned(),
                    secs: policy.timeout.as_secs(),
                }),
            },
        };

        let error = match result {
            Ok(findings) => {
                debug!(image, backend = name, findings = findings.len(), attempts, "scan finished");
                return ScanOutcome {
                    findings,
                    error: None,
                    attempts,
                };
            }
            Err(e) => e,
        };

        if error.is_retryable() && attempts <= policy.retries {
            let delay = policy.backoff * attempts;
            debug!(
                image,
                backend = name,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "scan failed, retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return failed(
                        image,
                        ScanError::Cancelled { backend: name.to_owned() },
                        attempts,
                    );
                }
                _ = tokio::time::sleep(delay) => {}
            }
            continue;
        }

        return failed(image, error, attempts);
    }
}

fn failed(image: &str, error: ScanError, attempts: u32) -> ScanOutcome {
    warn!(
        image,
        backend = error.backend(),
        attempts,
        error = %error,
        "scan failed, counting zero findings"
    );
    ScanOutcome {
        findings: Vec::new(),
        error: Some(error),
        attempts,
    }
}

/// 스캐너 프로세스를 실행하고 성공한 stdout을 반환합니다.
///
/// 실행 실패, 0이 아닌 종료 코드, 빈 출력을 [`ScanError`]로 바꿉니다.
pub(crate) async fn run_scanner<R: CommandRunner>(
    runner: &R,
    backend: &str,
    program: &str,
    args: &[String],
) -> Result<String, ScanError> {
    let output: CommandOutput =
        runner
            .run(program, args)
            .await
            .map_err(|e| ScanError::Spawn {
                backend: backend.to_owned(),
                reason: format!("{program}: {e}"),
            })?;

    if !output.success {
        return Err(ScanError::NonZeroExit {
            backend: backend.to_owned(),
            status: output.status_display(),
            stderr: output.stderr_str(),
        });
    }

    let stdout = output.stdout_str();
    if stdout.trim().is_empty() {
        return Err(ScanError::EmptyOutput {
            backend: backend.to_owned(),
        });
    }
    Ok(stdout.into_owned())
}
