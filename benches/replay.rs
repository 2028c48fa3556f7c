//! Reload benchmarks.
//!
//! Measures rebuilding a game from its log, and encoding the log in both
//! save formats.
//!
//! Run with: `cargo bench --bench replay`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rust_18xx::games::sample::SampleGameBuilder;
use rust_18xx::persistence::{ActionLogCodec, BincodeCodec, JsonCodec};
use rust_18xx::{GameManager, GameSetup, SaveFile, StandardVariant};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Play `steps` decisions, always taking the first round option.
fn recorded_game(steps: usize) -> SaveFile {
    let config = SampleGameBuilder::new().build();
    let mut manager = GameManager::standard(config, GameSetup::new(["Ann", "Bob", "Cy", "Dee"]))
        .expect("sample game starts");
    for _ in 0..steps {
        if manager.is_game_over() {
            break;
        }
        let next = manager
            .possible_actions()
            .iter()
            .find(|a| !a.is_meta() && !a.command.is_correction())
            .cloned();
        match next {
            Some(action) => {
                if manager.process(action).is_err() {
                    break;
                }
            }
            None => break,
        }
    }
    manager.save_file()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for steps in [50usize, 200, 800] {
        let save = recorded_game(steps);
        group.bench_with_input(BenchmarkId::from_parameter(save.actions.len()), &save, |b, save| {
            b.iter(|| {
                let config = SampleGameBuilder::new().build();
                GameManager::load(config, Arc::new(StandardVariant), black_box(save))
            });
        });
    }
    group.finish();
}

fn bench_codecs(c: &mut Criterion) {
    let save = recorded_game(800);
    let mut group = c.benchmark_group("codec");
    let codecs: [(&str, &dyn ActionLogCodec); 2] = [("bincode", &BincodeCodec), ("json", &JsonCodec)];
    for (name, codec) in codecs {
        group.bench_function(BenchmarkId::new("encode", name), |b| {
            b.iter(|| codec.serialize(black_box(&save)));
        });
        let Ok(bytes) = codec.serialize(&save) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("decode", name), |b| {
            b.iter(|| codec.deserialize(black_box(&bytes)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_codecs);
criterion_main!(benches);
