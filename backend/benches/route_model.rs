use backend::SyntheticRouter;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frontend::{MapConfig, MapReducer, MapUiState, RouteQuery, StateOp};
use shared::{bounding_box_of, path_length_m, Coordinate, MarkerData, TravelProfile};

fn track(len: usize) -> Vec<Coordinate> {
    (0..len)
        .map(|i| {
            let t = i as f64 / len as f64;
            Coordinate::new(30.40 + 0.3 * t, 114.20 + 0.3 * (t * 7.0).sin())
        })
        .collect()
}

fn benchmark_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    for len in [100, 1_000, 10_000] {
        let points = track(len);
        group.bench_with_input(BenchmarkId::new("bounding_box", len), &points, |b, points| {
            b.iter(|| bounding_box_of(black_box(points)))
        });
        group.bench_with_input(BenchmarkId::new("path_length", len), &points, |b, points| {
            b.iter(|| path_length_m(black_box(points)))
        });
    }
    group.finish();
}

fn benchmark_synthetic_router(c: &mut Criterion) {
    let router = SyntheticRouter::default();
    let query = RouteQuery::with_waypoints(
        Coordinate::new(30.5433, 114.3416),
        [Coordinate::new(30.5600, 114.3300), Coordinate::new(30.5800, 114.3600)],
        Coordinate::new(30.5455, 114.3500),
        TravelProfile::Bike,
    );
    c.bench_function("synthetic_route_three_legs", |b| {
        b.iter(|| router.route(black_box(&query)))
    });
}

fn benchmark_reducer(c: &mut Criterion) {
    let reducer = MapReducer::new(&MapConfig::default());
    let state = MapUiState::default();
    let markers: Vec<MarkerData> = track(200)
        .into_iter()
        .enumerate()
        .map(|(i, position)| MarkerData::new(format!("poi_{}", i % 150), position))
        .collect();

    c.bench_function("set_markers_200_with_duplicates", |b| {
        b.iter(|| reducer.reduce(black_box(&state), StateOp::SetMarkers(markers.clone())))
    });
}

criterion_group!(
    benches,
    benchmark_geometry,
    benchmark_synthetic_router,
    benchmark_reducer
);
criterion_main!(benches);
