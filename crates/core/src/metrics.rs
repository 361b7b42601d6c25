//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `helmscan_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(helmscan_core::metrics::IMAGES_DISCOVERED_TOTAL).increment(3);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 백엔드 레이블 키 (grype, trivy)
pub const LABEL_BACKEND: &str = "backend";

/// 심각도 레이블 키 (critical, high, medium, low)
pub const LABEL_SEVERITY: &str = "severity";

/// 결과 레이블 키 (success, failure, cancelled)
pub const LABEL_RESULT: &str = "result";

/// 보강 단계 레이블 키 (size, packages)
pub const LABEL_STAGE: &str = "stage";

// ─── 렌더링/탐색 메트릭 ────────────────────────────────────────────

/// 렌더링된 차트 수 (counter, label: result)
pub const CHARTS_RENDERED_TOTAL: &str = "helmscan_charts_rendered_total";

/// 매니페스트에서 발견된 이미지 참조 수 (counter)
pub const IMAGES_DISCOVERED_TOTAL: &str = "helmscan_images_discovered_total";

/// 인식되지 않아 건너뛴 매니페스트 문서 수 (counter)
pub const DOCUMENTS_SKIPPED_TOTAL: &str = "helmscan_documents_skipped_total";

// ─── 스캔 메트릭 ────────────────────────────────────────────────────

/// 완료된 스캔 수 (counter, labels: backend, result)
pub const SCANS_TOTAL: &str = "helmscan_scans_total";

/// 스캔 소요 시간 (histogram, 초, label: backend)
pub const SCAN_DURATION_SECONDS: &str = "helmscan_scan_duration_seconds";

/// 정규화된 취약점 수 (counter, labels: backend, severity)
pub const FINDINGS_TOTAL: &str = "helmscan_findings_total";

/// 인식되지 않은 심각도로 제외된 취약점 수 (counter, label: backend)
pub const FINDINGS_DROPPED_TOTAL: &str = "helmscan_findings_dropped_total";

/// 보강 단계 실패 수 (counter, label: stage)
pub const ENRICHMENT_FAILURES_TOTAL: &str = "helmscan_enrichment_failures_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 소요 시간 히스토그램 버킷 (초)
///
/// 이미지 pull과 DB 로딩을 포함하므로 1s ~ 600s 범위
pub const SCAN_DURATION_BUCKETS: [f64; 9] =
    [1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 450.0, 600.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다. 레코더가 없으면 no-op입니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        CHARTS_RENDERED_TOTAL,
        "Total number of chart render attempts by result"
    );
    describe_counter!(
        IMAGES_DISCOVERED_TOTAL,
        "Total number of image references extracted from rendered manifests"
    );
    describe_counter!(
        DOCUMENTS_SKIPPED_TOTAL,
        "Total number of manifest documents with no recognized pod spec"
    );
    describe_counter!(SCANS_TOTAL, "Total number of image scans by backend and result");
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        "Time to complete a single image scan in seconds"
    );
    describe_counter!(
        FINDINGS_TOTAL,
        "Total number of normalized findings by backend and severity"
    );
    describe_counter!(
        FINDINGS_DROPPED_TOTAL,
        "Total number of findings dropped for an unrecognized severity"
    );
    describe_counter!(
        ENRICHMENT_FAILURES_TOTAL,
        "Total number of failed enrichment lookups by stage"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        CHARTS_RENDERED_TOTAL,
        IMAGES_DISCOVERED_TOTAL,
        DOCUMENTS_SKIPPED_TOTAL,
        SCANS_TOTAL,
        SCAN_DURATION_SECONDS,
        FINDINGS_TOTAL,
        FINDINGS_DROPPED_TOTAL,
        ENRICHMENT_FAILURES_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_helmscan_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("helmscan_"),
                "Metric '{}' does not start with 'helmscan_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        for (i, a) in ALL_METRIC_NAMES.iter().enumerate() {
            for b in &ALL_METRIC_NAMES[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_BACKEND, LABEL_SEVERITY, LABEL_RESULT, LABEL_STAGE] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn scan_duration_buckets_are_sorted() {
        let buckets = SCAN_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
