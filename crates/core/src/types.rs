//! 도메인 타입 -- 워크스페이스 전역에서 사용되는 공통 타입
//!
//! 매니페스트 워커, 스캐너 어댑터, 집계기, 리포트가 공유하는 데이터 구조를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 정규화된 심각도 레벨
///
/// 백엔드마다 다른 심각도 어휘를 이 네 단계로 맞춥니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 리포트 컬럼 순서 (Critical, High, Medium, Low)
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// 스캐너가 보고한 심각도 라벨을 정규화합니다.
    ///
    /// 앞뒤 공백을 제거하고 대소문자를 구분하지 않고 비교합니다.
    /// 네 개의 정식 라벨과 정확히 일치하지 않으면 (`Negligible`, `Unknown`,
    /// 빈 문자열 등) `None`을 반환하며, 호출자는 해당 finding을 버립니다.
    /// 별칭(`crit`, `med`)이나 기본 버킷으로의 변환은 하지 않습니다.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// 소문자 라벨 (메트릭 레이블 등에 사용)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 심각도별 취약점 개수
///
/// 합계는 해당 스코프에서 정규화 후 남은 finding 수와 항상 같습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl SeverityCounts {
    /// finding 하나를 해당 버킷에 더합니다.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    /// 다른 집계를 더합니다.
    pub fn add(&mut self, other: &SeverityCounts) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
    }

    /// 특정 심각도의 개수를 반환합니다.
    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// 전체 취약점 수를 반환합니다.
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low
    }

    /// 모든 버킷이 0인지 확인합니다.
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<Severity> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        let mut counts = Self::default();
        for severity in iter {
            counts.record(severity);
        }
        counts
    }
}

impl fmt::Display for SeverityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C:{} H:{} M:{} L:{}",
            self.critical, self.high, self.medium, self.low,
        )
    }
}

/// 컨테이너 이미지 참조
///
/// `scope_path`는 이미지가 선언된 위치 (워크로드 이름, 컨테이너 이름) 입니다.
/// 한 번의 실행 안에서 `(scope_path, image)` 쌍은 유일합니다.
/// 같은 이미지가 여러 스코프에 나타나는 것은 정상입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageReference {
    /// 스코프 식별자 목록 (예: `["api", "web"]`)
    pub scope_path: Vec<String>,
    /// 이미지 문자열 (예: `registry/app:1.0`)
    pub image: String,
}

impl ImageReference {
    /// 새 이미지 참조를 생성합니다.
    pub fn new(scope_path: Vec<String>, image: impl Into<String>) -> Self {
        Self {
            scope_path,
            image: image.into(),
        }
    }

    /// 스코프 없이 이미지만으로 참조를 생성합니다 (이미지 단위 리포트용).
    pub fn image_only(image: impl Into<String>) -> Self {
        Self::new(Vec::new(), image)
    }

    /// 워크로드(Deployment 등) 이름
    pub fn workload(&self) -> Option<&str> {
        self.scope_path.first().map(String::as_str)
    }

    /// 컨테이너 이름
    pub fn container(&self) -> Option<&str> {
        if self.scope_path.len() < 2 {
            return None;
        }
        self.scope_path.last().map(String::as_str)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope_path.is_empty() {
            write!(f, "{}", self.image)
        } else {
            write!(f, "{} ({})", self.image, self.scope_path.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_display() {
        assert_eq!(Severity::Low.to_string(), "Low");
        assert_eq!(Severity::Medium.to_string(), "Medium");
        assert_eq!(Severity::High.to_string(), "High");
        assert_eq!(Severity::Critical.to_string(), "Critical");
    }

    #[test]
    fn from_label_is_case_insensitive_and_trims() {
        assert_eq!(Severity::from_label("Critical"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("critical"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("CRITICAL "), Some(Severity::Critical));
        assert_eq!(Severity::from_label("  high\n"), Some(Severity::High));
        assert_eq!(Severity::from_label("MeDiUm"), Some(Severity::Medium));
        assert_eq!(Severity::from_label("LOW"), Some(Severity::Low));
    }

    #[test]
    fn from_label_rejects_non_canonical_values() {
        assert_eq!(Severity::from_label("Negligible"), None);
        assert_eq!(Severity::from_label("Unknown"), None);
        assert_eq!(Severity::from_label("info"), None);
        assert_eq!(Severity::from_label(""), None);
        assert_eq!(Severity::from_label("   "), None);
        // 별칭은 허용하지 않음
        assert_eq!(Severity::from_label("crit"), None);
        assert_eq!(Severity::from_label("med"), None);
    }

    #[test]
    fn severity_counts_record_and_total() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::Critical);
        counts.record(Severity::Critical);
        counts.record(Severity::Low);
        assert_eq!(counts.critical, 2);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 3);
        assert!(!counts.is_zero());
    }

    #[test]
    fn severity_counts_from_iterator() {
        let counts: SeverityCounts = [Severity::High, Severity::High, Severity::Medium]
            .into_iter()
            .collect();
        assert_eq!(
            counts,
            SeverityCounts {
                critical: 0,
                high: 2,
                medium: 1,
                low: 0
            }
        );
    }

    #[test]
    fn severity_counts_add() {
        let mut a = SeverityCounts {
            critical: 1,
            high: 0,
            medium: 2,
            low: 0,
        };
        let b = SeverityCounts {
            critical: 0,
            high: 3,
            medium: 1,
            low: 4,
        };
        a.add(&b);
        assert_eq!(a.get(Severity::Critical), 1);
        assert_eq!(a.get(Severity::High), 3);
        assert_eq!(a.get(Severity::Medium), 3);
        assert_eq!(a.get(Severity::Low), 4);
    }

    #[test]
    fn severity_counts_serialize_lowercase_keys() {
        let counts = SeverityCounts {
            critical: 1,
            high: 2,
            medium: 3,
            low: 4,
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["critical"], 1);
        assert_eq!(json["low"], 4);
    }

    #[test]
    fn image_reference_accessors() {
        let reference = ImageReference::new(
            vec!["api".to_owned(), "web".to_owned()],
            "registry/app:1.0",
        );
        assert_eq!(reference.workload(), Some("api"));
        assert_eq!(reference.container(), Some("web"));
        assert_eq!(reference.to_string(), "registry/app:1.0 (api/web)");
    }

    #[test]
    fn image_only_reference_has_no_scope() {
        let reference = ImageReference::image_only("nginx:1.25");
        assert_eq!(reference.workload(), None);
        assert_eq!(reference.container(), None);
        assert_eq!(reference.to_string(), "nginx:1.25");
    }

    #[test]
    fn image_reference_orders_by_scope_first() {
        let a = ImageReference::new(vec!["a".to_owned(), "x".to_owned()], "z:1");
        let b = ImageReference::new(vec!["b".to_owned(), "x".to_owned()], "a:1");
        assert!(a < b);
    }
}
