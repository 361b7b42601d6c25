//! 집계기
//!
//! 정규화된 finding을 스코프(행) × 백엔드 단위로 세고, 백엔드별 합계를 유지합니다.
//! [`Aggregator`]는 오케스트레이터 태스크만 소유하며 워커 태스크는 결과를 반환할 뿐
//! 직접 쓰지 않습니다.

use helmscan_core::metrics as m;
use helmscan_core::types::{Severity, SeverityCounts};

use crate::types::{BackendCounts, NormalizedFinding};

/// finding 목록의 심각도별 개수를 셉니다.
pub fn count(findings: &[NormalizedFinding]) -> SeverityCounts {
    findings.iter().map(|f| f.severity).collect()
}

/// 행 × 백엔드 개수와 백엔드별 합계 누적기
#[derive(Debug, Clone)]
pub struct Aggregator {
    backends: Vec<String>,
    rows: Vec<Vec<SeverityCounts>>,
    totals: Vec<SeverityCounts>,
}

impl Aggregator {
    /// 모든 칸이 0인 누적기를 생성합니다.
    pub fn new(row_count: usize, backends: Vec<String>) -> Self {
        let width = backends.len();
        Self {
            rows: vec![vec![SeverityCounts::default(); width]; row_count],
            totals: vec![SeverityCounts::default(); width],
            backends,
        }
    }

    /// 백엔드 이름 목록
    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    /// 한 행의 한 백엔드 결과를 기록하고 그 개수를 반환합니다.
    ///
    /// 같은 칸에 다시 기록하면 누적됩니다. 범위를 벗어난 인덱스는 무시합니다.
    pub fn aggregate(
        &mut self,
        row: usize,
        backend_idx: usize,
        findings: &[NormalizedFinding],
    ) -> SeverityCounts {
        let counts = count(findings);
        let Some(cell) = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(backend_idx))
        else {
            return counts;
        };
        cell.add(&counts);
        if let Some(total) = self.totals.get_mut(backend_idx) {
            total.add(&counts);
        }

        let backend = self.backends[backend_idx].clone();
        for severity in Severity::ALL {
            let n = counts.get(severity);
            if n > 0 {
                metrics::counter!(
                    m::FINDINGS_TOTAL,
                    m::LABEL_BACKEND => backend.clone(),
                    m::LABEL_SEVERITY => severity.as_str()
                )
                .increment(n);
            }
        }
        counts
    }

    /// 한 행의 백엔드별 개수
    pub fn row(&self, row: usize) -> Vec<BackendCounts> {
        let cells = self.rows.get(row);
        self.backends
            .iter()
            .enumerate()
            .map(|(i, name)| BackendCounts {
                backend: name.clone(),
                counts: cells
                    .and_then(|c| c.get(i))
                    .copied()
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// 백엔드별 합계
    pub fn totals(&self) -> Vec<BackendCounts> {
        self.backends
            .iter()
            .zip(&self.totals)
            .map(|(name, counts)| BackendCounts {
                backend: name.clone(),
                counts: *counts,
            })
            .collect()
    }
}
