//! 이미지 스캐너 설정
//!
//! [`ImageScannerConfig`]는 core의 [`HelmscanConfig`](helmscan_core::config::HelmscanConfig)에서
//! 렌더링/스캔/리포트 섹션을 모아 오케스트레이터가 바로 쓸 수 있는 형태로 바꿉니다.
//!
//! # 사용 예시
//!
//! ```
//! use helmscan_image_scanner::{ImageScannerConfig, ImageScannerConfigBuilder, ReportScope};
//!
//! // 기본값으로 생성
//! let config = ImageScannerConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! let config = ImageScannerConfigBuilder::new()
//!     .backends(vec!["grype".to_owned(), "trivy".to_owned()])
//!     .concurrency(8)
//!     .scope(ReportScope::Image)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.concurrency, 8);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use helmscan_core::config::{HelmscanConfig, KNOWN_BACKENDS, MAX_CONCURRENCY, MAX_RETRIES};

use crate::backend::ScanPolicy;
use crate::error::ImageScannerError;
use crate::types::ReportScope;

/// 이미지 스캐너 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageScannerConfig {
    /// helm 실행 파일
    pub helm_binary: String,
    /// 렌더링 타임아웃 (초)
    pub render_timeout_secs: u64,
    /// 활성 백엔드 (리포트 컬럼 순서)
    pub backends: Vec<String>,
    /// 동시 스캔 수
    pub concurrency: usize,
    /// 스캔 1회 타임아웃 (초)
    pub scan_timeout_secs: u64,
    /// 실행 전체 타임아웃 (초). 0이면 제한 없음
    pub run_timeout_secs: u64,
    /// 스캔 재시도 횟수
    pub retries: u32,
    /// 재시도 기본 대기 시간 (밀리초)
    pub retry_backoff_ms: u64,
    pub grype_binary: String,
    pub trivy_binary: String,
    /// trivy `--skip-db-update` 사용 여부
    pub trivy_skip_db_update: bool,
    /// 리포트 단위
    pub scope: ReportScope,
    /// 이미지 크기 수집 여부
    pub enrich_size: bool,
    /// 패키지 수 수집 여부
    pub enrich_packages: bool,
    pub docker_binary: String,
    pub syft_binary: String,
}

impl Default for ImageScannerConfig {
    fn default() -> Self {
        Self {
            helm_binary: "helm".to_owned(),
            render_timeout_secs: 300,
            backends: vec!["grype".to_owned()],
            concurrency: 4,
            scan_timeout_secs: 600,
            run_timeout_secs: 0,
            retries: 0,
            retry_backoff_ms: 1000,
            grype_binary: "grype".to_owned(),
            trivy_binary: "trivy".to_owned(),
            trivy_skip_db_update: true,
            scope: ReportScope::Container,
            enrich_size: false,
            enrich_packages: false,
            docker_binary: "docker".to_owned(),
            syft_binary: "syft".to_owned(),
        }
    }
}

impl ImageScannerConfig {
    /// core 설정에서 스캐너 설정을 생성합니다.
    ///
    /// core 설정은 이미 검증되었다고 가정하며, 알 수 없는 scope 값은 기본값으로 대체합니다.
    pub fn from_core(core: &HelmscanConfig) -> Self {
        Self {
            helm_binary: core.render.helm_binary.clone(),
            render_timeout_secs: core.render.timeout_secs,
            backends: core.scan.backends.clone(),
            concurrency: core.scan.concurrency,
            scan_timeout_secs: core.scan.scan_timeout_secs,
            run_timeout_secs: core.scan.run_timeout_secs,
            retries: core.scan.retries,
            retry_backoff_ms: core.scan.retry_backoff_ms,
            grype_binary: core.scan.grype_binary.clone(),
            trivy_binary: core.scan.trivy_binary.clone(),
            trivy_skip_db_update: core.scan.trivy_skip_db_update,
            scope: core.report.scope.parse().unwrap_or_default(),
            enrich_size: core.report.enrich_size,
            enrich_packages: core.report.enrich_packages,
            docker_binary: core.report.docker_binary.clone(),
            syft_binary: core.report.syft_binary.clone(),
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `backends`: 하나 이상, 중복 없음
    /// - `concurrency`: 1-64
    /// - `scan_timeout_secs`, `render_timeout_secs`: 0 불가
    /// - `retries`: 0-10
    pub fn validate(&self) -> Result<(), ImageScannerError> {
        if self.backends.is_empty() {
            return Err(config_error("backends", "at least one backend required"));
        }
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.trim().is_empty() {
                return Err(config_error("backends", "backend name must not be empty"));
            }
            if self.backends[..i].contains(backend) {
                return Err(config_error(
                    "backends",
                    &format!("duplicate backend '{backend}'"),
                ));
            }
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(config_error(
                "concurrency",
                &format!("must be 1-{MAX_CONCURRENCY}"),
            ));
        }
        if self.scan_timeout_secs == 0 {
            return Err(config_error("scan_timeout_secs", "must be greater than 0"));
        }
        if self.render_timeout_secs == 0 {
            return Err(config_error("render_timeout_secs", "must be greater than 0"));
        }
        if self.retries > MAX_RETRIES {
            return Err(config_error("retries", &format!("must be 0-{MAX_RETRIES}")));
        }
        Ok(())
    }

    /// 설정된 백엔드 중 내장 구현이 있는 것만 반환합니다.
    pub fn builtin_backends(&self) -> impl Iterator<Item = &str> {
        self.backends
            .iter()
            .map(String::as_str)
            .filter(|b| KNOWN_BACKENDS.contains(b))
    }

    /// 스캔 호출 정책
    pub fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy {
            timeout: Duration::from_secs(self.scan_timeout_secs),
            retries: self.retries,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// 실행 전체 타임아웃
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}

fn config_error(field: &str, reason: &str) -> ImageScannerError {
    ImageScannerError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// [`ImageScannerConfig`] 빌더
///
/// 빌드 시 유효성을 검증합니다.
#[derive(Default)]
pub struct ImageScannerConfigBuilder {
    config: ImageScannerConfig,
}

impl ImageScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// helm 실행 파일을 설정합니다.
    pub fn helm_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.helm_binary = binary.into();
        self
    }

    /// 활성 백엔드 목록을 설정합니다.
    pub fn backends(mut self, backends: Vec<String>) -> Self {
        self.config.backends = backends;
        self
    }

    /// 동시 스캔 수를 설정합니다.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// 스캔 1회 타임아웃(초)을 설정합니다.
    pub fn scan_timeout_secs(mut self, secs: u64) -> Self {
        self.config.scan_timeout_secs = secs;
        self
    }

    /// 실행 전체 타임아웃(초)을 설정합니다.
    pub fn run_timeout_secs(mut self, secs: u64) -> Self {
        self.config.run_timeout_secs = secs;
        self
    }

    /// 재시도 횟수와 기본 대기 시간을 설정합니다.
    pub fn retries(mut self, retries: u32, backoff_ms: u64) -> Self {
        self.config.retries = retries;
        self.config.retry_backoff_ms = backoff_ms;
        self
    }

    /// 리포트 단위를 설정합니다.
    pub fn scope(mut self, scope: ReportScope) -> Self {
        self.config.scope = scope;
        self
    }

    /// 이미지 크기 수집 여부를 설정합니다.
    pub fn enrich_size(mut self, enabled: bool) -> Self {
        self.config.enrich_size = enabled;
        self
    }

    /// 패키지 수 수집 여부를 설정합니다.
    pub fn enrich_packages(mut self, enabled: bool) -> Self {
        self.config.enrich_packages = enabled;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ImageScannerError::Config` 반환
    pub fn build(self) -> Result<ImageScannerConfig, ImageScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
