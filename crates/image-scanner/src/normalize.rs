//! 심각도 정규화
//!
//! 백엔드 고유 심각도 라벨을 `Critical/High/Medium/Low` 네 단계로 매핑합니다.
//! 그 밖의 값(`Negligible`, `Unknown`, 누락 등)은 어떤 버킷에도 넣지 않고 버립니다.
//! 버린 finding은 경고 없이 `debug!` 로그와 메트릭으로만 남습니다.

use tracing::debug;

use helmscan_core::metrics as m;
use helmscan_core::types::Severity;

use crate::backend::ScanBackend;
use crate::types::{NormalizedFinding, RawFinding};

/// 단일 finding의 심각도를 정규화합니다.
pub fn normalize(raw: &RawFinding, backend: &dyn ScanBackend) -> Option<Severity> {
    Severity::from_label(backend.severity_label(raw)?)
}

/// finding 목록을 정규화하고 버린 개수를 함께 반환합니다.
pub fn normalize_all(
    raws: &[RawFinding],
    backend: &dyn ScanBackend,
) -> (Vec<NormalizedFinding>, u64) {
    let mut kept = Vec::with_capacity(raws.len());
    let mut dropped = 0u64;

    for raw in raws {
        match normalize(raw, backend) {
            Some(severity) => kept.push(NormalizedFinding { severity }),
            None => {
                dropped += 1;
                debug!(
                    backend = backend.name(),
                    label = backend.severity_label(raw).unwrap_or("<missing>"),
                    "dropping finding with unmapped severity"
                );
            }
        }
    }

    if dropped > 0 {
        metrics::counter!(
            m::FINDINGS_DROPPED_TOTAL,
            m::LABEL_BACKEND => backend.name().to_owned()
        )
        .increment(dropped);
    }

    (kept, dropped)
}
