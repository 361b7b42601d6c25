//! 이미지 스캐너 에러 타입
//!
//! [`ImageScannerError`]는 한 번의 스캔 실행을 중단시키는 치명적 에러만 나타냅니다.
//! 개별 이미지 스캔 실패는 에러로 전파되지 않고 리포트의 경고로 남습니다.
//! `From<ImageScannerError> for HelmscanError` 구현으로 `?` 연산자를 통해
//! 상위 에러 타입으로 전파됩니다.

use helmscan_core::error::{ConfigError, HelmscanError, RenderError};

/// 매니페스트 해석 에러
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// YAML로 해석할 수 없는 렌더링 결과
    #[error("invalid YAML in rendered manifest (document {index}): {reason}")]
    InvalidYaml {
        /// 0부터 시작하는 문서 순번
        index: usize,
        /// 파서 에러 메시지
        reason: String,
    },
}

impl From<WalkError> for RenderError {
    fn from(err: WalkError) -> Self {
        RenderError::InvalidOutput(err.to_string())
    }
}

/// 이미지 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ImageScannerError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 차트 렌더링 실패
    #[error(transparent)]
    Render(#[from] RenderError),

    /// 렌더링 결과 해석 실패
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// 컨테이너 이미지를 하나도 찾지 못함
    #[error("no container images found in chart '{chart}'")]
    EmptyDiscovery {
        /// 차트 참조
        chart: String,
    },
}

impl From<ImageScannerError> for HelmscanError {
    fn from(err: ImageScannerError) -> Self {
        match err {
            ImageScannerError::Config { field, reason } => {
                HelmscanError::Config(ConfigError::InvalidValue { field, reason })
            }
            ImageScannerError::Render(e) => HelmscanError::Render(e),
            ImageScannerError::Walk(e) => HelmscanError::Render(e.into()),
            ImageScannerError::EmptyDiscovery { chart } => HelmscanError::EmptyDiscovery { chart },
        }
    }
}
