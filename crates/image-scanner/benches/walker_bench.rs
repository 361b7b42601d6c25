//! 매니페스트 워커 벤치마크
//!
//! 렌더링된 매니페스트 크기별 이미지 추출 성능과 이미지 단위 병합 비용을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use helmscan_image_scanner::{extract_images, unique_images};

/// `count`개의 Deployment(컨테이너 2개 + init 1개)와 Service로 이루어진 매니페스트
fn synthetic_manifest(count: usize) -> String {
    let mut manifest = String::new();
    for i in 0..count {
        manifest.push_str(&format!(
            "---\n\
             apiVersion: apps/v1\n\
             kind: Deployment\n\
             metadata:\n  name: svc-{i}\n\
             spec:\n  template:\n    spec:\n\
             \x20     initContainers:\n\
             \x20       - name: init\n          image: registry/init:{v}\n\
             \x20     containers:\n\
             \x20       - name: app\n          image: registry/app-{i}:1.0\n\
             \x20       - name: proxy\n          image: registry/proxy:2.0\n\
             ---\n\
             apiVersion: v1\n\
             kind: Service\n\
             metadata:\n  name: svc-{i}\n\
             spec:\n  ports:\n    - port: 80\n",
            v = i % 5,
        ));
    }
    manifest
}

fn bench_extract_images(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_images");
    for count in [10usize, 100, 1000] {
        let manifest = synthetic_manifest(count);
        group.throughput(Throughput::Bytes(manifest.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &manifest, |b, m| {
            b.iter(|| extract_images(black_box(m)))
        });
    }
    group.finish();
}

fn bench_unique_images(c: &mut Criterion) {
    let references = extract_images(&synthetic_manifest(1000)).unwrap_or_default();
    c.bench_function("unique_images_1000_workloads", |b| {
        b.iter(|| unique_images(black_box(&references)))
    });
}

criterion_group!(benches, bench_extract_images, bench_unique_images);
criterion_main!(benches);
