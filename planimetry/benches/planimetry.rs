//! Benchmarks du calcul de planimétrie

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{Geometry, LineString, Polygon};
use planimetry::{
    CoordinateReferenceSystem, Ellipsoid, Feature, GeometryKind, Planimeter, TransformPolicy,
};

/// Polygone régulier de `n` sommets autour de Paris
fn regular_polygon(n: usize, radius_deg: f64) -> Polygon {
    let coords: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (2.35 + radius_deg * t.cos(), 48.85 + radius_deg * t.sin())
        })
        .collect();
    Polygon::new(LineString::from(coords), vec![])
}

fn bench_ring(c: &mut Criterion) {
    let planimeter = Planimeter::new(Ellipsoid::WGS84);

    let mut group = c.benchmark_group("polygon_planimetry");
    for n in [10, 100, 1000, 10_000] {
        let polygon = regular_polygon(n, 0.01);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &polygon, |b, p| {
            b.iter(|| black_box(planimeter.polygon_planimetry(black_box(p))))
        });
    }
    group.finish();
}

fn bench_projected_feature(c: &mut Criterion) {
    let crs = CoordinateReferenceSystem::from_epsg(2154).unwrap();
    let processor =
        planimetry::processor_for(&crs, GeometryKind::MultiPolygon, TransformPolicy::Abort)
            .unwrap();

    // Parcelle de 500 sommets en Lambert 93
    let coords: Vec<(f64, f64)> = (0..500)
        .map(|i| {
            let t = 2.0 * std::f64::consts::PI * i as f64 / 500.0;
            (652000.0 + 50.0 * t.cos(), 6862000.0 + 50.0 * t.sin())
        })
        .collect();
    let feature = Feature {
        geometry: Some(Geometry::Polygon(Polygon::new(LineString::from(coords), vec![]))),
        ..Default::default()
    };

    c.bench_function("process_lambert93_feature", |b| {
        b.iter(|| black_box(processor.process(black_box(feature.clone())).unwrap()))
    });
}

criterion_group!(benches, bench_ring, bench_projected_feature);
criterion_main!(benches);
