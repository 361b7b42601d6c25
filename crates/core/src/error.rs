//! 에러 타입 -- 도메인별 에러 정의
//!
//! # 분류
//!
//! - **치명적**: [`ConfigError`], [`RenderError`], [`HelmscanError::EmptyDiscovery`]
//!   -- 실행을 즉시 중단하며 리포트를 만들지 않습니다.
//! - **복구 가능**: [`ScanError`] -- 해당 이미지/백엔드의 결과만 0건으로 처리하고
//!   경고를 남긴 뒤 다음 스캔을 계속합니다.
//!
//! 인식할 수 없는 심각도 값은 에러가 아니며 조용히 제외됩니다.

/// helmscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HelmscanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 차트 렌더링 실패
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// 렌더링은 성공했지만 컨테이너 이미지를 하나도 찾지 못함
    #[error("no container images found in chart '{chart}'")]
    EmptyDiscovery { chart: String },

    /// 스캔 에러 (파이프라인 밖으로 전파되는 경우만)
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 차트 렌더링 에러
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// 렌더링 도구 실행 자체가 실패함 (바이너리 없음 등)
    #[error("failed to run '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// 렌더링 도구가 0이 아닌 종료 코드를 반환함
    #[error("'{program}' exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// 렌더링 결과를 매니페스트로 해석할 수 없음
    #[error("invalid rendered manifest: {0}")]
    InvalidOutput(String),

    /// 렌더링 시간 초과
    #[error("rendering timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// 이미지 스캔 에러
///
/// 모든 variant는 복구 가능하며, 호출자는 0건의 finding으로 대체합니다.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 스캐너 프로세스 실행 실패
    #[error("{backend}: failed to run scanner: {reason}")]
    Spawn { backend: String, reason: String },

    /// 스캐너가 0이 아닌 종료 코드를 반환함
    #[error("{backend}: scanner exited with status {status}: {stderr}")]
    NonZeroExit {
        backend: String,
        status: String,
        stderr: String,
    },

    /// 스캐너 출력이 비어 있음
    #[error("{backend}: scanner produced no output")]
    EmptyOutput { backend: String },

    /// 스캐너 출력 파싱 실패
    #[error("{backend}: malformed scanner output: {reason}")]
    MalformedOutput { backend: String, reason: String },

    /// 단일 스캔 시간 초과
    #[error("{backend}: scan timed out after {secs}s")]
    Timeout { backend: String, secs: u64 },

    /// 실행 전체 타임아웃으로 스캔이 취소됨
    #[error("{backend}: scan cancelled before completion")]
    Cancelled { backend: String },
}

impl ScanError {
    /// 에러가 발생한 백엔드 이름을 반환합니다.
    pub fn backend(&self) -> &str {
        match self {
            Self::Spawn { backend, .. }
            | Self::NonZeroExit { backend, .. }
            | Self::EmptyOutput { backend }
            | Self::MalformedOutput { backend, .. }
            | Self::Timeout { backend, .. }
            | Self::Cancelled { backend } => backend,
        }
    }

    /// 재시도할 가치가 있는 에러인지 반환합니다.
    ///
    /// 취소된 스캔은 재시도하지 않습니다.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled { .. })
    }
}
