//! Performance benchmarks for the per-tick hot path

use server::simulation::{Simulation, TickInput};
use shared::{frame_line, Intent, Plaintext, Snapshot};
use std::time::Instant;

/// Benchmarks simulation stepping with both paddles active
#[test]
fn benchmark_simulation_step() {
    let mut sim = Simulation::new();
    let input = TickInput {
        left: Intent::Down,
        right: Intent::Up,
        ..TickInput::default()
    };

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        sim.step(input);
    }

    let duration = start.elapsed();
    println!(
        "Simulation step: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(sim.tick, iterations);
    // A 60Hz tick budget is ~16ms; stepping must be a negligible share of it
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks encoding and decoding of the state line
#[test]
fn benchmark_state_line_codec() {
    let snapshot = Snapshot {
        left_y: 215,
        right_y: 420,
        ball_x: 637,
        ball_y: 13,
        left_score: 4,
        right_score: 3,
    };
    let cipher = Plaintext;

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let line = frame_line(&cipher, &snapshot.to_string());
        let decoded: Snapshot = line.trim_end().parse().unwrap();
        assert_eq!(decoded.right_score, 3);
    }

    let duration = start.elapsed();
    println!(
        "State line codec: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks a full simulated round: the left paddle hides at the top
/// until the right side has won
#[test]
fn benchmark_full_round() {
    let mut sim = Simulation::new();
    let input = TickInput {
        left: Intent::Up,
        ..TickInput::default()
    };

    let start = Instant::now();
    let mut ticks = 0;
    while sim.step(input).winner.is_none() {
        ticks += 1;
        assert!(ticks < 10_000, "round never finished");
    }

    let duration = start.elapsed();
    println!("Full round: {} ticks in {:?}", ticks, duration);

    assert_eq!(sim.snapshot().right_score, shared::WIN_SCORE);
    assert!(duration.as_millis() < 100);
}
