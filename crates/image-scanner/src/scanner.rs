//! 차트 스캔 오케스트레이터 -- 전체 스캔 흐름 관리
//!
//! [`ChartScanner`]는 한 번의 실행을 끝까지 수행합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! ChartRequest --> ChartRenderer --> manifest text
//!                                          |
//!                                   extract_images
//!                                          |
//!                          Vec<ImageReference> (행, 순서 고정)
//!                                          |
//!                     Enricher (고유 이미지마다 Size / Packages)
//!                                          |
//!        JoinSet: (행, 백엔드)마다 태스크 하나, Semaphore로 동시 실행 수 제한
//!                                          |
//!                       scan_or_empty --> normalize_all
//!                                          |
//!                        Aggregator (오케스트레이터만 기록)
//!                                          |
//!                                   AggregateReport
//! ```
//!
//! 렌더링 실패와 빈 탐색 결과만 치명적이며, 개별 스캔 실패는 0건 + 경고로 처리됩니다.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use helmscan_core::error::ScanError;
use helmscan_core::metrics as m;
use helmscan_core::types::ImageReference;

use crate::aggregate::Aggregator;
use crate::backend::{GrypeBackend, ScanBackend, ScanPolicy, TrivyBackend, grype, scan_or_empty, trivy};
use crate::config::ImageScannerConfig;
use crate::enrich::{
    DockerSizeEnricher, EnrichStage, Enricher, SyftPackageEnricher, enrich_or_unavailable,
};
use crate::error::ImageScannerError;
use crate::normalize::normalize_all;
use crate::render::{ChartRenderer, ChartRequest, HelmRenderer};
use crate::report::{AggregateReport, ReportRow, ScanWarning};
use crate::runner::CommandRunner;
use crate::types::{NormalizedFinding, ReportScope};
use crate::walker::{extract_images, unique_images};

/// 워커 태스크 하나의 결과
struct ScanTaskResult {
    row: usize,
    backend_idx: usize,
    findings: Vec<NormalizedFinding>,
    error: Option<ScanError>,
}

/// 차트 스캔 오케스트레이터
///
/// 렌더러, 백엔드, 부가 정보 수집기는 모두 trait 객체로 등록됩니다.
/// [`ChartScannerBuilder`]로 생성합니다.
pub struct ChartScanner {
    config: ImageScannerConfig,
    renderer: Option<Arc<dyn ChartRenderer>>,
    backends: Vec<Arc<dyn ScanBackend>>,
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl ChartScanner {
    /// 스캐너 설정
    pub fn config(&self) -> &ImageScannerConfig {
        &self.config
    }

    /// 활성 백엔드 이름 (등록 순서)
    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_owned()).collect()
    }

    /// 차트를 렌더링하고 스캔합니다.
    ///
    /// # Errors
    ///
    /// - `Config`: 요청 값이 잘못되었거나 렌더러가 등록되지 않음
    /// - `Render` / `Walk`: 렌더링 실패 또는 해석할 수 없는 출력
    /// - `EmptyDiscovery`: 이미지를 하나도 찾지 못함
    pub async fn scan_chart(
        &self,
        request: &ChartRequest,
    ) -> Result<AggregateReport, ImageScannerError> {
        request.validate()?;
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| ImageScannerError::Config {
                field: "renderer".to_owned(),
                reason: "no chart renderer registered".to_owned(),
            })?;

        let manifest = renderer.render(request).await?;
        self.scan_manifest(&request.chart, &manifest).await
    }

    /// 이미 렌더링된 매니페스트를 스캔합니다.
    pub async fn scan_manifest(
        &self,
        chart: &str,
        manifest: &str,
    ) -> Result<AggregateReport, ImageScannerError> {
        let discovered = extract_images(manifest)?;
        let references: Vec<ImageReference> = match self.config.scope {
            ReportScope::Container => discovered,
            ReportScope::Image => unique_images(&discovered).into_iter().collect(),
        };

        if references.is_empty() {
            return Err(ImageScannerError::EmptyDiscovery {
                chart: chart.to_owned(),
            });
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        metrics::counter!(m::IMAGES_DISCOVERED_TOTAL).increment(references.len() as u64);
        info!(
            run_id = %run_id,
            chart,
            references = references.len(),
            backends = self.backends.len(),
            scope = %self.config.scope,
            "images discovered"
        );

        // 실행 제한 시간은 부가 정보 수집부터 적용됩니다.
        let cancel = CancellationToken::new();
        let deadline = self.config.run_timeout().map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!(secs = limit.as_secs(), "run timeout reached, cancelling remaining work");
                cancel.cancel();
            })
        });

        let enrichment = self.enrich(&references, &cancel).await;
        let backend_names = self.backend_names();
        let mut aggregator = Aggregator::new(references.len(), backend_names.clone());
        let mut done = vec![vec![false; backend_names.len()]; references.len()];
        let mut warnings: Vec<(usize, usize, ScanWarning)> = Vec::new();

        let mut tasks = self.spawn_scans(&references, &cancel);
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "scan task failed to complete");
                    continue;
                }
            };

            aggregator.aggregate(result.row, result.backend_idx, &result.findings);
            done[result.row][result.backend_idx] = true;
            if let Some(error) = result.error {
                let reference = &references[result.row];
                warnings.push((
                    result.row,
                    result.backend_idx,
                    ScanWarning {
                        scope_path: reference.scope_path.clone(),
                        image: reference.image.clone(),
                        backend: backend_names[result.backend_idx].clone(),
                        message: error.to_string(),
                    },
                ));
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        for (row, cells) in done.iter().enumerate() {
            for (backend_idx, finished) in cells.iter().enumerate() {
                if !finished {
                    let reference = &references[row];
                    warnings.push((
                        row,
                        backend_idx,
                        ScanWarning {
                            scope_path: reference.scope_path.clone(),
                            image: reference.image.clone(),
                            backend: backend_names[backend_idx].clone(),
                            message: "scan task did not complete".to_owned(),
                        },
                    ));
                }
            }
        }
        warnings.sort_by_key(|(row, backend_idx, _)| (*row, *backend_idx));

        let rows: Vec<ReportRow> = references
            .into_iter()
            .enumerate()
            .map(|(i, reference)| {
                let size = enrichment.value(EnrichStage::Size, &reference.image);
                let packages = enrichment.value(EnrichStage::Packages, &reference.image);
                ReportRow {
                    counts: aggregator.row(i),
                    reference,
                    size,
                    packages,
                }
            })
            .collect();

        let report = AggregateReport {
            run_id,
            chart: chart.to_owned(),
            scope: self.config.scope,
            backends: backend_names,
            rows,
            totals: aggregator.totals(),
            warnings: warnings.into_iter().map(|(_, _, w)| w).collect(),
        };

        info!(
            run_id = %report.run_id,
            rows = report.rows.len(),
            warnings = report.warnings.len(),
            "chart scan completed"
        );
        Ok(report)
    }

    /// (행, 백엔드)마다 스캔 태스크를 생성합니다.
    fn spawn_scans(
        &self,
        references: &[ImageReference],
        cancel: &CancellationToken,
    ) -> JoinSet<ScanTaskResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let policy = self.config.scan_policy();
        let mut tasks = JoinSet::new();

        for (row, reference) in references.iter().enumerate() {
            for (backend_idx, backend) in self.backends.iter().enumerate() {
                let backend = Arc::clone(backend);
                let image = reference.image.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = cancel.clone();
                tasks.spawn(async move {
                    let (findings, error) =
                        run_scan(backend.as_ref(), &image, &policy, &semaphore, &cancel).await;
                    ScanTaskResult {
                        row,
                        backend_idx,
                        findings,
                        error,
                    }
                });
            }
        }
        tasks
    }

    /// 고유 이미지마다 등록된 수집기를 실행합니다.
    ///
    /// 호출마다 스캔 타임아웃이 적용되며, 실행이 취소되면 남은 값은 모두 `None`입니다.
    async fn enrich(&self, references: &[ImageReference], cancel: &CancellationToken) -> Enrichment {
        let mut enrichment = Enrichment::default();
        if self.enrichers.is_empty() {
            return enrichment;
        }

        let timeout = self.config.scan_policy().timeout;
        let images: BTreeSet<&str> = references.iter().map(|r| r.image.as_str()).collect();
        for image in images {
            for enricher in &self.enrichers {
                let value = enrich_or_unavailable(enricher.as_ref(), image, timeout, cancel).await;
                debug!(image, stage = %enricher.stage(), ?value, "enriched");
                enrichment
                    .values
                    .insert((enricher.stage(), image.to_owned()), value);
            }
        }
        enrichment
    }
}

/// 이미지별 부가 정보
#[derive(Debug, Default)]
struct Enrichment {
    values: HashMap<(EnrichStage, String), Option<u64>>,
}

impl Enrichment {
    fn value(&self, stage: EnrichStage, image: &str) -> Option<u64> {
        self.values
            .get(&(stage, image.to_owned()))
            .copied()
            .flatten()
    }
}

/// 세마포어 허가를 얻은 뒤 스캔하고 정규화합니다.
///
/// 허가를 기다리는 동안 실행이 취소되면 스캔을 시작하지 않습니다.
async fn run_scan(
    backend: &dyn ScanBackend,
    image: &str,
    policy: &ScanPolicy,
    semaphore: &Arc<Semaphore>,
    cancel: &CancellationToken,
) -> (Vec<NormalizedFinding>, Option<ScanError>) {
    let name = backend.name().to_owned();

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        warn!(image, backend = %name, "scan skipped, run cancelled");
        metrics::counter!(m::SCANS_TOTAL, m::LABEL_BACKEND => name.clone(), m::LABEL_RESULT => "cancelled")
            .increment(1);
        return (Vec::new(), Some(ScanError::Cancelled { backend: name }));
    };

    let started = Instant::now();
    let outcome = scan_or_empty(backend, image, policy, cancel).await;
    let elapsed = started.elapsed();

    let result = match &outcome.error {
        None => "success",
        Some(ScanError::Cancelled { .. }) => "cancelled",
        Some(_) => "failure",
    };
    metrics::counter!(m::SCANS_TOTAL, m::LABEL_BACKEND => name.clone(), m::LABEL_RESULT => result)
        .increment(1);
    metrics::histogram!(m::SCAN_DURATION_SECONDS, m::LABEL_BACKEND => name.clone())
        .record(elapsed.as_secs_f64());

    let (findings, dropped) = normalize_all(&outcome.findings, backend);
    debug!(
        image,
        backend = %name,
        raw = outcome.findings.len(),
        kept = findings.len(),
        dropped,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "scan normalized"
    );
    (findings, outcome.error)
}

/// [`ChartScanner`] 빌더
pub struct ChartScannerBuilder {
    config: ImageScannerConfig,
    renderer: Option<Arc<dyn ChartRenderer>>,
    backends: Vec<Arc<dyn ScanBackend>>,
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl ChartScannerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ImageScannerConfig::default(),
            renderer: None,
            backends: Vec::new(),
            enrichers: Vec::new(),
        }
    }

    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: ImageScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 차트 렌더러를 지정합니다.
    pub fn renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// 스캔 백엔드를 등록합니다. 등록 순서가 리포트 컬럼 순서입니다.
    pub fn backend(mut self, backend: Arc<dyn ScanBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// 부가 정보 수집기를 등록합니다.
    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// 설정에 따라 내장 구현(helm 렌더러, grype/trivy 백엔드, docker/syft 수집기)을 등록합니다.
    ///
    /// 현재 설정을 기준으로 하므로 [`config`](Self::config) 이후에 호출해야 합니다.
    pub fn builtin_components<R>(mut self, runner: R) -> Self
    where
        R: CommandRunner + Clone,
    {
        let config = &self.config;
        self.renderer = Some(Arc::new(HelmRenderer::new(
            runner.clone(),
            config.helm_binary.clone(),
            Duration::from_secs(config.render_timeout_secs),
        )));

        for name in config.builtin_backends() {
            let backend: Arc<dyn ScanBackend> = match name {
                grype::NAME => Arc::new(
                    GrypeBackend::new(runner.clone()).with_binary(config.grype_binary.clone()),
                ),
                trivy::NAME => Arc::new(
                    TrivyBackend::new(runner.clone())
                        .with_binary(config.trivy_binary.clone())
                        .skip_db_update(config.trivy_skip_db_update),
                ),
                _ => continue,
            };
            self.backends.push(backend);
        }

        if config.enrich_size {
            self.enrichers.push(Arc::new(DockerSizeEnricher::new(
                runner.clone(),
                config.docker_binary.clone(),
            )));
        }
        if config.enrich_packages {
            self.enrichers.push(Arc::new(SyftPackageEnricher::new(
                runner,
                config.syft_binary.clone(),
            )));
        }
        self
    }

    /// 스캐너를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정이 잘못되었거나, 백엔드가 없거나, 백엔드 이름이 중복되면 `ImageScannerError::Config`
    pub fn build(self) -> Result<ChartScanner, ImageScannerError> {
        self.config.validate()?;

        if self.backends.is_empty() {
            return Err(ImageScannerError::Config {
                field: "backends".to_owned(),
                reason: "no scan backend registered".to_owned(),
            });
        }
        for (i, backend) in self.backends.iter().enumerate() {
            if self.backends[..i].iter().any(|b| b.name() == backend.name()) {
                return Err(ImageScannerError::Config {
                    field: "backends".to_owned(),
                    reason: format!("backend '{}' registered more than once", backend.name()),
                });
            }
        }

        Ok(ChartScanner {
            config: self.config,
            renderer: self.renderer,
            backends: self.backends,
            enrichers: self.enrichers,
        })
    }
}

impl Default for ChartScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
