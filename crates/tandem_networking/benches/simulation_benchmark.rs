//! # Simulation Benchmark
//!
//! Host frame cost: integrating both slots, pacing the broadcast and
//! encoding the snapshot that goes on the wire. All three run inside one
//! display frame, so together they must stay far below 16 ms.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tandem_networking::simulation::step_players;
use tandem_networking::{SimulationConfig, SimulationLoop};
use tandem_shared::{Arena, InputState, Message, Players, StateSnapshot, PLAYER_SPEED};

// =============================================================================
// INTEGRATION
// =============================================================================

fn bench_step_players(c: &mut Criterion) {
    let arena = Arena::default();
    let local = InputState { up: true, right: true, ..InputState::IDLE };
    let remote = InputState { left: true, ..InputState::IDLE };
    let mut players = Players::spawn(&arena);

    c.bench_function("step_players_diagonal", |b| {
        b.iter(|| {
            step_players(
                black_box(&mut players),
                black_box(&local),
                black_box(&remote),
                1.0 / 60.0,
                PLAYER_SPEED,
                &arena,
            );
        });
    });
}

// =============================================================================
// PACING
// =============================================================================

fn bench_loop_second(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_loop_one_second");

    for tick_hz in [60_u32, 144, 240] {
        group.bench_with_input(BenchmarkId::from_parameter(tick_hz), &tick_hz, |b, &hz| {
            let step = Duration::from_secs(1) / hz;
            b.iter(|| {
                let mut sim = SimulationLoop::new(&SimulationConfig::default());
                let t0 = Instant::now();
                sim.start();
                let mut broadcasts = 0;
                for frame in 0..=hz {
                    if let Some(dt) = sim.advance(t0 + step * frame) {
                        broadcasts += u32::from(sim.broadcast_due(dt));
                    }
                }
                black_box(broadcasts)
            });
        });
    }
    group.finish();
}

// =============================================================================
// WIRE
// =============================================================================

fn bench_snapshot_codec(c: &mut Criterion) {
    let message = Message::State(StateSnapshot {
        players: Players::spawn(&Arena::default()),
        timestamp: 1_700_000_000_000,
    });
    let frame = message.encode().unwrap_or_default();

    c.bench_function("state_encode", |b| {
        b.iter(|| black_box(&message).encode());
    });
    c.bench_function("state_decode", |b| {
        b.iter(|| Message::decode(black_box(&frame)));
    });
}

criterion_group!(benches, bench_step_players, bench_loop_second, bench_snapshot_codec);
criterion_main!(benches);
