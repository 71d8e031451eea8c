use campus_transit::{
    entities::BusStop,
    proximity::{nearest_stops, rank_by_distance},
    shared::Coordinate,
};
use criterion::{Criterion, criterion_group, criterion_main};
use std::{hint::black_box, time::Duration};

fn stops(count: usize) -> Vec<BusStop> {
    (0..count)
        .map(|i| BusStop {
            id: i.to_string(),
            name: format!("Stop {i}"),
            lat: 42.03 + (i % 97) as f64 * 0.0005,
            lon: -87.69 + (i % 89) as f64 * 0.0005,
            route: format!("{}", 201 + i % 4),
            direction: if i % 2 == 0 { "Northbound" } else { "Southbound" }.into(),
            ..Default::default()
        })
        .collect()
}

fn rank(stops: &[BusStop], user: Coordinate) {
    let _ = black_box(rank_by_distance(stops, Some(user)));
}

fn nearest(stops: &[BusStop], user: Coordinate) {
    let _ = black_box(nearest_stops(stops, user));
}

fn criterion_benchmark(c: &mut Criterion) {
    let user = Coordinate::from((42.0577, -87.6753));
    let campus = stops(250);
    let region = stops(10_000);

    let mut group = c.benchmark_group("Proximity");

    group.warm_up_time(Duration::from_secs(3));

    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Rank campus stops", |b| b.iter(|| rank(&campus, user)));

    group.bench_function("Rank region stops", |b| b.iter(|| rank(&region, user)));

    group.bench_function("Nearest per direction", |b| {
        b.iter(|| nearest(&region, user))
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
