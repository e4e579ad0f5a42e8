//! Benchmarks for the grid path planner.
//!
//! Run with: cargo bench --bench planner

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tile_pilot::core::types::Position;
use tile_pilot::navigation::find_path_with;
use tile_pilot::world::local_map::{Confidence, TileClass};

/// Serpentine maze: every other column is a wall with a gap at alternating ends
fn serpentine(size: i32) -> impl Fn(Position) -> TileClass {
    move |p| {
        if p.x < 0 || p.y < 0 || p.x >= size || p.y >= size {
            return TileClass::OutOfBounds;
        }
        let wall_column = p.x % 2 == 1;
        let gap_row = if (p.x / 2) % 2 == 0 { size - 1 } else { 0 };
        if wall_column && p.y != gap_row {
            TileClass::Blocked(Confidence::Derived)
        } else {
            TileClass::Walkable(Confidence::Derived)
        }
    }
}

fn open(size: i32) -> impl Fn(Position) -> TileClass {
    move |p| {
        if p.x < 0 || p.y < 0 || p.x >= size || p.y >= size {
            TileClass::OutOfBounds
        } else {
            TileClass::Walkable(Confidence::Derived)
        }
    }
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");

    // 11 is the default 11x11 window; the larger sizes cover full maps
    for size in [11, 32, 64] {
        let start = Position::new(0, 0);
        // Last even column, so the goal is never inside a wall column
        let goal = Position::new((size - 1) & !1, size - 1);

        let classify = open(size);
        group.bench_with_input(BenchmarkId::new("open", size), &size, |b, _| {
            b.iter(|| black_box(find_path_with(black_box(start), black_box(goal), &classify)))
        });

        let classify = serpentine(size);
        group.bench_with_input(BenchmarkId::new("serpentine", size), &size, |b, _| {
            b.iter(|| black_box(find_path_with(black_box(start), black_box(goal), &classify)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_path);
criterion_main!(benches);
