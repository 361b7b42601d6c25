//! 설정 관리 -- helmscan.toml 파싱 및 런타임 설정
//!
//! [`HelmscanConfig`]는 렌더링, 스캔, 리포트 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HELMSCAN_SCAN_CONCURRENCY=8` 형식)
//! 3. 설정 파일 (`helmscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), helmscan_core::error::HelmscanError> {
//! use helmscan_core::config::HelmscanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HelmscanConfig::load("helmscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HelmscanConfig::parse("[scan]\nbackends = [\"grype\", \"trivy\"]")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HelmscanError};

/// 내장 스캐너 백엔드 이름
pub const KNOWN_BACKENDS: [&str; 2] = ["grype", "trivy"];

/// 동시 스캔 수 상한
pub const MAX_CONCURRENCY: usize = 64;

/// 재시도 횟수 상한
pub const MAX_RETRIES: u32 = 10;

/// helmscan 통합 설정
///
/// `helmscan.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelmscanConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 차트 렌더링 설정
    #[serde(default)]
    pub render: RenderConfig,
    /// 스캔 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 리포트 설정
    #[serde(default)]
    pub report: ReportConfig,
}

impl HelmscanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HelmscanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에서 시작하는 [`load`](Self::load)
    ///
    /// 파일이 존재하지만 읽을 수 없거나 파싱에 실패하면 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, HelmscanError> {
        let config = Self::read_or_default(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// 파일(없으면 기본값)과 환경변수를 합친 설정을 검증 없이 반환합니다.
    ///
    /// CLI 플래그처럼 이후에 덮어쓸 값이 있을 때 사용하며, 호출자가 마지막에
    /// [`validate`](Self::validate)를 호출해야 합니다.
    pub async fn read_or_default(path: impl AsRef<Path>) -> Result<Self, HelmscanError> {
        let mut config = match Self::read_file(path.as_ref()).await {
            Ok(config) => config,
            Err(HelmscanError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HelmscanError> {
        let config = Self::read_file(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self, HelmscanError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HelmscanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HelmscanError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HelmscanError> {
        toml::from_str(toml_str).map_err(|e| {
            HelmscanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HELMSCAN_{SECTION}_{FIELD}`
    /// 예: `HELMSCAN_SCAN_BACKENDS=grype,trivy`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HELMSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HELMSCAN_GENERAL_LOG_FORMAT");

        // Render
        override_string(&mut self.render.helm_binary, "HELMSCAN_RENDER_HELM_BINARY");
        override_string(&mut self.render.release, "HELMSCAN_RENDER_RELEASE");
        override_string(&mut self.render.namespace, "HELMSCAN_RENDER_NAMESPACE");
        override_string(&mut self.render.values_file, "HELMSCAN_RENDER_VALUES_FILE");
        override_string(&mut self.render.repo, "HELMSCAN_RENDER_REPO");
        override_csv(&mut self.render.set, "HELMSCAN_RENDER_SET");
        override_u64(&mut self.render.timeout_secs, "HELMSCAN_RENDER_TIMEOUT_SECS");

        // Scan
        override_csv(&mut self.scan.backends, "HELMSCAN_SCAN_BACKENDS");
        override_usize(&mut self.scan.concurrency, "HELMSCAN_SCAN_CONCURRENCY");
        override_u64(
            &mut self.scan.scan_timeout_secs,
            "HELMSCAN_SCAN_SCAN_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.scan.run_timeout_secs,
            "HELMSCAN_SCAN_RUN_TIMEOUT_SECS",
        );
        override_u32(&mut self.scan.retries, "HELMSCAN_SCAN_RETRIES");
        override_u64(
            &mut self.scan.retry_backoff_ms,
            "HELMSCAN_SCAN_RETRY_BACKOFF_MS",
        );
        override_string(&mut self.scan.grype_binary, "HELMSCAN_SCAN_GRYPE_BINARY");
        override_string(&mut self.scan.trivy_binary, "HELMSCAN_SCAN_TRIVY_BINARY");
        override_bool(
            &mut self.scan.trivy_skip_db_update,
            "HELMSCAN_SCAN_TRIVY_SKIP_DB_UPDATE",
        );

        // Report
        override_string(&mut self.report.scope, "HELMSCAN_REPORT_SCOPE");
        override_string(&mut self.report.csv_path, "HELMSCAN_REPORT_CSV_PATH");
        override_bool(&mut self.report.write_csv, "HELMSCAN_REPORT_WRITE_CSV");
        override_bool(&mut self.report.enrich_size, "HELMSCAN_REPORT_ENRICH_SIZE");
        override_bool(
            &mut self.report.enrich_packages,
            "HELMSCAN_REPORT_ENRICH_PACKAGES",
        );
        override_string(&mut self.report.docker_binary, "HELMSCAN_REPORT_DOCKER_BINARY");
        override_string(&mut self.report.syft_binary, "HELMSCAN_REPORT_SYFT_BINARY");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HelmscanError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.render.validate()?;
        self.scan.validate()?;
        self.report.validate()?;

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 차트 렌더링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// helm 실행 파일 이름 또는 경로
    pub helm_binary: String,
    /// 릴리스 이름
    pub release: String,
    /// 네임스페이스
    pub namespace: String,
    /// values 파일 경로 (빈 문자열이면 사용하지 않음)
    pub values_file: String,
    /// 원격 차트 저장소 URL (빈 문자열이면 로컬/이름 차트)
    pub repo: String,
    /// `key=value` 형식의 값 오버라이드
    pub set: Vec<String>,
    /// 렌더링 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            helm_binary: "helm".to_owned(),
            release: "scan-release".to_owned(),
            namespace: "default".to_owned(),
            values_file: String::new(),
            repo: String::new(),
            set: Vec::new(),
            timeout_secs: 300,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<(), HelmscanError> {
        if self.helm_binary.trim().is_empty() {
            return Err(invalid("render.helm_binary", "must not be empty"));
        }
        if self.release.trim().is_empty() {
            return Err(invalid("render.release", "must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(invalid("render.namespace", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("render.timeout_secs", "must be greater than 0"));
        }
        for entry in &self.set {
            validate_set_entry(entry)?;
        }
        Ok(())
    }
}

/// `--set` 값이 `key=value` 형식인지 검증합니다.
///
/// `=`가 있어야 하고 키는 비어 있으면 안 됩니다. 값은 비어 있어도 됩니다.
pub fn validate_set_entry(entry: &str) -> Result<(), ConfigError> {
    let reason = match entry.split_once('=') {
        Some((key, _)) if !key.trim().is_empty() => return Ok(()),
        Some(_) => format!("'{entry}' has an empty key"),
        None => format!("'{entry}' must be in key=value form"),
    };
    Err(ConfigError::InvalidValue {
        field: "render.set".to_owned(),
        reason,
    })
}

/// 스캔 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 사용할 백엔드 목록 (grype, trivy). 순서대로 리포트 컬럼이 만들어집니다.
    pub backends: Vec<String>,
    /// 동시 스캔 수 (1-64)
    pub concurrency: usize,
    /// 단일 스캔 타임아웃 (초)
    pub scan_timeout_secs: u64,
    /// 전체 실행 타임아웃 (초, 0 = 제한 없음)
    pub run_timeout_secs: u64,
    /// 스캔 실패 시 재시도 횟수 (0 = 재시도 없음)
    pub retries: u32,
    /// 재시도 간 기본 대기 시간 (밀리초, 시도 횟수에 비례해 증가)
    pub retry_backoff_ms: u64,
    /// grype 실행 파일
    pub grype_binary: String,
    /// trivy 실행 파일
    pub trivy_binary: String,
    /// trivy 실행 시 취약점 DB 업데이트 생략
    pub trivy_skip_db_update: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            backends: vec!["grype".to_owned()],
            concurrency: 4,
            scan_timeout_secs: 600,
            run_timeout_secs: 0,
            retries: 0,
            retry_backoff_ms: 1000,
            grype_binary: "grype".to_owned(),
            trivy_binary: "trivy".to_owned(),
            trivy_skip_db_update: true,
        }
    }
}

impl ScanConfig {
    fn validate(&self) -> Result<(), HelmscanError> {
        if self.backends.is_empty() {
            return Err(invalid("scan.backends", "at least one backend is required"));
        }
        for (idx, backend) in self.backends.iter().enumerate() {
            if !KNOWN_BACKENDS.contains(&backend.as_str()) {
                return Err(invalid(
                    "scan.backends",
                    format!(
                        "unknown backend '{backend}', must be one of: {}",
                        KNOWN_BACKENDS.join(", ")
                    ),
                ));
            }
            if self.backends[..idx].contains(backend) {
                return Err(invalid(
                    "scan.backends",
                    format!("backend '{backend}' listed more than once"),
                ));
            }
        }

        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(invalid(
                "scan.concurrency",
                format!("must be between 1 and {MAX_CONCURRENCY}"),
            ));
        }
        if self.scan_timeout_secs == 0 {
            return Err(invalid("scan.scan_timeout_secs", "must be greater than 0"));
        }
        if self.retries > MAX_RETRIES {
            return Err(invalid(
                "scan.retries",
                format!("must be at most {MAX_RETRIES}"),
            ));
        }
        if self.backends.iter().any(|b| b == "grype") && self.grype_binary.trim().is_empty() {
            return Err(invalid("scan.grype_binary", "must not be empty"));
        }
        if self.backends.iter().any(|b| b == "trivy") && self.trivy_binary.trim().is_empty() {
            return Err(invalid("scan.trivy_binary", "must not be empty"));
        }
        Ok(())
    }
}

/// 리포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 리포트 단위 (container, image)
    pub scope: String,
    /// CSV 출력 경로
    pub csv_path: String,
    /// CSV 파일 작성 여부
    pub write_csv: bool,
    /// 이미지 크기 수집 (docker 필요)
    pub enrich_size: bool,
    /// 패키지 수 수집 (syft 필요)
    pub enrich_packages: bool,
    /// docker 실행 파일
    pub docker_binary: String,
    /// syft 실행 파일
    pub syft_binary: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            scope: "container".to_owned(),
            csv_path: "helmscan-report.csv".to_owned(),
            write_csv: true,
            enrich_size: false,
            enrich_packages: false,
            docker_binary: "docker".to_owned(),
            syft_binary: "syft".to_owned(),
        }
    }
}

impl ReportConfig {
    fn validate(&self) -> Result<(), HelmscanError> {
        let valid_scopes = ["container", "image"];
        if !valid_scopes.contains(&self.scope.as_str()) {
            return Err(invalid(
                "report.scope",
                format!("must be one of: {}", valid_scopes.join(", ")),
            ));
        }
        if self.write_csv && self.csv_path.trim().is_empty() {
            return Err(invalid(
                "report.csv_path",
                "must not be empty when write_csv is enabled",
            ));
        }
        if self.enrich_size && self.docker_binary.trim().is_empty() {
            return Err(invalid("report.docker_binary", "must not be empty"));
        }
        if self.enrich_packages && self.syft_binary.trim().is_empty() {
            return Err(invalid("report.syft_binary", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> HelmscanError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = HelmscanConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.render.release, "scan-release");
        assert_eq!(config.render.namespace, "default");
        assert_eq!(config.scan.backends, vec!["grype"]);
        assert_eq!(config.scan.concurrency, 4);
        assert_eq!(config.scan.scan_timeout_secs, 600);
        assert_eq!(config.scan.retries, 0);
        assert_eq!(config.report.scope, "container");
        assert_eq!(config.report.csv_path, "helmscan-report.csv");
        assert!(!config.report.enrich_size);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = HelmscanConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = HelmscanConfig::parse("").unwrap();
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.scan.grype_binary, "grype");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[scan]
backends = ["grype", "trivy"]
concurrency = 8
"#;
        let config = HelmscanConfig::parse(toml).unwrap();
        assert_eq!(config.scan.backends, vec!["grype", "trivy"]);
        assert_eq!(config.scan.concurrency, 8);
        // 지정하지 않은 필드는 기본값 유지
        assert_eq!(config.scan.scan_timeout_secs, 600);
        assert_eq!(config.render.release, "scan-release");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[render]
helm_binary = "/usr/local/bin/helm"
release = "audit"
namespace = "prod"
values_file = "values-prod.yaml"
repo = "https://charts.example.com"
set = ["image.tag=1.2.3", "replicas=2"]
timeout_secs = 60

[scan]
backends = ["trivy"]
concurrency = 2
scan_timeout_secs = 120
run_timeout_secs = 3600
retries = 2
retry_backoff_ms = 250
trivy_binary = "/opt/trivy"
trivy_skip_db_update = false

[report]
scope = "image"
csv_path = "out/report.csv"
write_csv = false
enrich_size = true
enrich_packages = true
"#;
        let config = HelmscanConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.render.namespace, "prod");
        assert_eq!(config.render.set.len(), 2);
        assert_eq!(config.scan.backends, vec!["trivy"]);
        assert_eq!(config.scan.run_timeout_secs, 3600);
        assert!(!config.scan.trivy_skip_db_update);
        assert_eq!(config.report.scope, "image");
        assert!(config.report.enrich_packages);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = HelmscanConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            HelmscanError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = HelmscanConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_unknown_backend() {
        let mut config = HelmscanConfig::default();
        config.scan.backends = vec!["clair".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("clair"));
    }

    #[test]
    fn validate_rejects_duplicate_backend() {
        let mut config = HelmscanConfig::default();
        config.scan.backends = vec!["grype".to_owned(), "grype".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn validate_rejects_empty_backends() {
        let mut config = HelmscanConfig::default();
        config.scan.backends.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_concurrency() {
        let mut config = HelmscanConfig::default();
        config.scan.concurrency = 0;
        assert!(config.validate().is_err());
        config.scan.concurrency = MAX_CONCURRENCY + 1;
        assert!(config.validate().is_err());
        config.scan.concurrency = MAX_CONCURRENCY;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_scan_timeout() {
        let mut config = HelmscanConfig::default();
        config.scan.scan_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scan_timeout_secs"));
    }

    #[test]
    fn validate_rejects_invalid_scope() {
        let mut config = HelmscanConfig::default();
        config.report.scope = "namespace".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("report.scope"));
    }

    #[test]
    fn validate_rejects_empty_csv_path_only_when_writing() {
        let mut config = HelmscanConfig::default();
        config.report.csv_path = String::new();
        assert!(config.validate().is_err());
        config.report.write_csv = false;
        config.validate().unwrap();
    }

    #[test]
    fn set_entry_validation() {
        validate_set_entry("image.tag=1.0").unwrap();
        validate_set_entry("empty=").unwrap();
        assert!(validate_set_entry("novalue").is_err());
        assert!(validate_set_entry("=value").is_err());
        assert!(validate_set_entry(" =value").is_err());
    }

    #[test]
    fn validate_rejects_malformed_set_in_config() {
        let mut config = HelmscanConfig::default();
        config.render.set = vec!["ok=1".to_owned(), "broken".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("render.set"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_HELMSCAN_STR", "overridden") };
        override_string(&mut val, "TEST_HELMSCAN_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_HELMSCAN_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_HELMSCAN_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_HELMSCAN_BOOL_BAD");
        assert!(!val);
        unsafe { std::env::remove_var("TEST_HELMSCAN_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_skips_empty_items() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_HELMSCAN_CSV", "grype, trivy,") };
        override_csv(&mut val, "TEST_HELMSCAN_CSV");
        assert_eq!(val, vec!["grype", "trivy"]);
        unsafe { std::env::remove_var("TEST_HELMSCAN_CSV") };
    }

    #[test]
    #[serial]
    fn apply_env_overrides_updates_sections() {
        let mut config = HelmscanConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe {
            std::env::set_var("HELMSCAN_SCAN_BACKENDS", "grype,trivy");
            std::env::set_var("HELMSCAN_SCAN_CONCURRENCY", "16");
            std::env::set_var("HELMSCAN_RENDER_NAMESPACE", "staging");
            std::env::set_var("HELMSCAN_REPORT_WRITE_CSV", "false");
        }
        config.apply_env_overrides();
        unsafe {
            std::env::remove_var("HELMSCAN_SCAN_BACKENDS");
            std::env::remove_var("HELMSCAN_SCAN_CONCURRENCY");
            std::env::remove_var("HELMSCAN_RENDER_NAMESPACE");
            std::env::remove_var("HELMSCAN_REPORT_WRITE_CSV");
        }
        assert_eq!(config.scan.backends, vec!["grype", "trivy"]);
        assert_eq!(config.scan.concurrency, 16);
        assert_eq!(config.render.namespace, "staging");
        assert!(!config.report.write_csv);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = HelmscanConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = HelmscanConfig::parse(&toml_str).unwrap();
        assert_eq!(config.render.release, parsed.render.release);
        assert_eq!(config.scan.backends, parsed.scan.backends);
        assert_eq!(config.report.csv_path, parsed.report.csv_path);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = HelmscanConfig::from_file("/nonexistent/path/helmscan.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HelmscanError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    #[serial]
    async fn load_or_default_missing_file_uses_defaults() {
        let config = HelmscanConfig::load_or_default("/nonexistent/path/helmscan.toml")
            .await
            .unwrap();
        assert_eq!(config.render.release, "scan-release");
    }
}
