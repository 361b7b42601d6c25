//! 리포트 모델
//!
//! [`AggregateReport`]는 워커 출력 순서를 그대로 유지하는 행 목록과 백엔드별 합계를 담습니다.
//! 모든 행과 합계에는 활성 백엔드마다 항목이 하나씩 있습니다(0일 수 있음).
//! 출력(표, JSON, CSV)은 CLI 쪽 sink가 담당하며, 여기서는 컬럼 구성과 셀 값만 정합니다.

use serde::{Deserialize, Serialize};

use helmscan_core::types::{ImageReference, Severity, SeverityCounts};

use crate::types::{BackendCounts, ReportScope};

/// 값이 없는 셀 표시
pub const NOT_AVAILABLE: &str = "N/A";

/// 복구 가능한 실패 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub scope_path: Vec<String>,
    pub image: String,
    pub backend: String,
    pub message: String,
}

/// 리포트 한 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// 이미지 참조
    pub reference: ImageReference,
    /// 백엔드별 개수 (활성 백엔드 순서)
    pub counts: Vec<BackendCounts>,
    /// 이미지 크기 (바이트), 알 수 없으면 `None`
    pub size: Option<u64>,
    /// 패키지 수, 알 수 없으면 `None`
    pub packages: Option<u64>,
}

impl ReportRow {
    /// 지정한 백엔드의 개수
    pub fn counts_for(&self, backend: &str) -> Option<&SeverityCounts> {
        self.counts
            .iter()
            .find(|c| c.backend == backend)
            .map(|c| &c.counts)
    }

    /// 컬럼 순서에 맞춘 셀 값
    ///
    /// [`report_columns`]와 같은 스코프/백엔드 목록으로 호출해야 합니다.
    pub fn cells(&self, scope: ReportScope, backends: &[String]) -> Vec<String> {
        let mut cells = Vec::new();
        if scope == ReportScope::Container {
            cells.push(self.reference.workload().unwrap_or_default().to_owned());
            cells.push(self.reference.container().unwrap_or_default().to_owned());
        }
        cells.push(self.reference.image.clone());
        cells.push(optional_cell(self.size));
        cells.push(optional_cell(self.packages));
        for backend in backends {
            let counts = self.counts_for(backend).copied().unwrap_or_default();
            cells.extend(Severity::ALL.iter().map(|s| counts.get(*s).to_string()));
        }
        cells
    }
}

/// 한 번의 실행 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    /// 실행 ID (UUID v4)
    pub run_id: String,
    /// 차트 참조
    pub chart: String,
    /// 리포트 단위
    pub scope: ReportScope,
    /// 활성 백엔드 (등록 순서)
    pub backends: Vec<String>,
    /// 행 목록 (워커 출력 순서)
    pub rows: Vec<ReportRow>,
    /// 백엔드별 합계
    pub totals: Vec<BackendCounts>,
    /// 복구 가능한 실패 목록
    pub warnings: Vec<ScanWarning>,
}

impl AggregateReport {
    /// 백엔드마다 행 합계가 totals와 같은지 확인합니다.
    pub fn is_consistent(&self) -> bool {
        self.backends.iter().all(|backend| {
            let mut sum = SeverityCounts::default();
            for row in &self.rows {
                match row.counts_for(backend) {
                    Some(counts) => sum.add(counts),
                    None => return false,
                }
            }
            self.totals
                .iter()
                .find(|t| &t.backend == backend)
                .is_some_and(|t| t.counts == sum)
        })
    }

    /// 지정한 백엔드의 합계
    pub fn total_for(&self, backend: &str) -> Option<&SeverityCounts> {
        self.totals
            .iter()
            .find(|t| t.backend == backend)
            .map(|t| &t.counts)
    }

    /// 컬럼 이름
    pub fn columns(&self) -> Vec<String> {
        report_columns(self.scope, &self.backends)
    }
}

/// 리포트 컬럼 이름
///
/// 백엔드가 둘 이상이면 심각도 컬럼을 `<backend>_Critical` 형태로 백엔드마다 만듭니다.
pub fn report_columns(scope: ReportScope, backends: &[String]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    if scope == ReportScope::Container {
        columns.push("Deployment".to_owned());
        columns.push("Container".to_owned());
    }
    columns.extend(["Image", "Size", "Packages"].map(str::to_owned));

    if backends.len() > 1 {
        for backend in backends {
            columns.extend(Severity::ALL.iter().map(|s| format!("{backend}_{s}")));
        }
    } else {
        columns.extend(Severity::ALL.iter().map(|s| s.to_string()));
    }
    columns
}

fn optional_cell(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_owned(), |v| v.to_string())
}
