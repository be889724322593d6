use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quickhop::align::{AlignmentMap, ScreenPos, Viewport};
use quickhop::labels::LabelPlan;
use quickhop::matching::{MatchSource, arrange, discover, search_lines};
use std::hint::black_box;

// =============================================================================
// Label Generation Benchmarks
// =============================================================================

/// Benchmark generating labels for increasingly crowded screens.
/// Target: well under 1ms even at 2000 targets (one full dense pane).
fn bench_label_generation(c: &mut Criterion) {
    let alphabet = "asdghklqwertyuiopzxcvbnmfj;";
    let mut group = c.benchmark_group("label_generation");
    for n in [10usize, 100, 500, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let plan = LabelPlan::new(n, alphabet, 1, None);
                let labels: Vec<String> = plan.iter().take(n).collect();
                black_box(labels)
            })
        });
    }
    group.finish();
}

// =============================================================================
// Alignment Benchmarks
// =============================================================================

/// Wrap logical lines at `width` chars the way tmux renders them.
fn wrap(logical: &str, width: usize) -> String {
    let mut rows = Vec::new();
    for line in logical.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            rows.push(chunk.iter().collect());
        }
    }
    rows.join("\n")
}

fn synthetic_pane(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            format!(
                "{i:>6}  GET https://host{i}.example.com/api/v1/items?page={i} -> \
                 /var/log/app/request-{i}.log (cache/entry_{i}.json)"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Benchmark the two-pointer alignment walk on a 50-line capture narrow
/// enough that every line wraps.
fn bench_alignment(c: &mut Criterion) {
    let logical = synthetic_pane(50);
    let display = wrap(&logical, 60);
    let height = display.split('\n').count();
    let viewport = Viewport::new(60, height);

    c.bench_function("align_wrapped_pane_50_lines", |b| {
        b.iter(|| black_box(AlignmentMap::align(&display, &logical, viewport)))
    });
}

/// Benchmark the full translation round trip over every cell of the pane.
fn bench_alignment_lookups(c: &mut Criterion) {
    let logical = synthetic_pane(50);
    let display = wrap(&logical, 60);
    let height = display.split('\n').count();
    let viewport = Viewport::new(60, height);
    let map = AlignmentMap::align(&display, &logical, viewport).expect("aligns");

    c.bench_function("alignment_lookup_full_viewport", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for y in 0..viewport.height {
                for x in 0..viewport.width {
                    acc += map.logical_at(ScreenPos::new(x, y));
                }
            }
            black_box(acc)
        })
    });
}

// =============================================================================
// Discovery / Arrangement Benchmarks
// =============================================================================

/// Benchmark the full quickcopy candidate pipeline (default-ish tiers) over a
/// 50-line pane dense with URLs and paths.
fn bench_discover_and_arrange(c: &mut Criterion) {
    let logical = synthetic_pane(50);
    let viewport = Viewport::new(220, 50);
    let map = AlignmentMap::identity(&logical, viewport);
    let tiers: Vec<Vec<MatchSource>> = vec![
        vec![
            MatchSource::parse("urls").unwrap(),
            MatchSource::parse("abspaths").unwrap(),
        ],
        vec![
            MatchSource::parse("paths").unwrap(),
            MatchSource::parse("filenames").unwrap(),
        ],
        vec![MatchSource::parse("lines").unwrap()],
    ];

    c.bench_function("discover_arrange_dense_pane", |b| {
        b.iter(|| {
            let found = discover(&logical, &tiers, 4, &map);
            black_box(arrange(found, true, logical.chars().count()))
        })
    });
}

/// Benchmark the literal needle scan used by the motion flows.
fn bench_needle_scan(c: &mut Criterion) {
    let lines: Vec<String> = synthetic_pane(50).split('\n').map(String::from).collect();

    c.bench_function("needle_scan_50_lines", |b| {
        b.iter(|| black_box(search_lines(&lines, "e", 2, false)))
    });
}

criterion_group!(
    benches,
    bench_label_generation,
    bench_alignment,
    bench_alignment_lookups,
    bench_discover_and_arrange,
    bench_needle_scan
);
criterion_main!(benches);
