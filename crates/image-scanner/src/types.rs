//! 스캐너 도메인 타입

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use helmscan_core::types::{Severity, SeverityCounts};

/// dyn-compatible trait에서 사용하는 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 스캐너가 보고한 원본 finding
///
/// 백엔드 고유 형식의 JSON 레코드입니다. 코어는 심각도 필드 외에는 해석하지 않으며,
/// 심각도 필드의 위치는 [`ScanBackend::severity_label`](crate::backend::ScanBackend::severity_label)이
/// 알고 있습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFinding(pub serde_json::Value);

impl RawFinding {
    /// JSON 값에서 finding을 생성합니다.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// 내부 JSON 값을 반환합니다.
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// 키 경로를 따라 내려가 문자열 필드를 찾습니다.
    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        let mut current = &self.0;
        for key in path {
            current = current.get(key)?;
        }
        current.as_str()
    }
}

/// 정규화된 finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFinding {
    pub severity: Severity,
}

/// 리포트 단위
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    /// 워크로드/컨테이너 단위 (워커 출력 그대로)
    #[default]
    Container,
    /// 고유 이미지 단위
    Image,
}

impl ReportScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "container" => Ok(Self::Container),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown report scope '{other}'")),
        }
    }
}

/// 한 백엔드의 심각도별 개수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCounts {
    /// 백엔드 이름
    pub backend: String,
    /// 심각도별 개수
    pub counts: SeverityCounts,
}

impl BackendCounts {
    pub fn zero(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            counts: SeverityCounts::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_finding_str_at_follows_path() {
        let raw = RawFinding::new(serde_json::json!({
            "vulnerability": { "id": "CVE-2024-0001", "severity": "High" }
        }));
        assert_eq!(raw.str_at(&["vulnerability", "severity"]), Some("High"));
        assert_eq!(raw.str_at(&["vulnerability", "missing"]), None);
        assert_eq!(raw.str_at(&["vulnerability"]), None);
    }

    #[test]
    fn raw_finding_non_string_field_is_none() {
        let raw = RawFinding::new(serde_json::json!({ "Severity": 3 }));
        assert_eq!(raw.str_at(&["Severity"]), None);
    }

    #[test]
    fn report_scope_parse() {
        assert_eq!("container".parse::<ReportScope>(), Ok(ReportScope::Container));
        assert_eq!(" Image ".parse::<ReportScope>(), Ok(ReportScope::Image));
        assert!("cluster".parse::<ReportScope>().is_err());
        assert_eq!(ReportScope::default(), ReportScope::Container);
    }

    #[test]
    fn report_scope_serializes_lowercase() {
        let json = serde_json::to_string(&ReportScope::Image).unwrap();
        assert_eq!(json, "\"image\"");
    }
}
