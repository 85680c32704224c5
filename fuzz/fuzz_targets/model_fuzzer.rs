//! Fuzz target comparing the real two-peer system against the model
//!
//! # Strategy
//!
//! - Operation sequences: Arbitrary flag writes, readiness changes, leaves
//!   and rejoins, including out-of-range seats
//! - Delivery: Seeded duplicate injection in the relay
//!
//! # Invariants
//!
//! - Every operation result matches the model
//! - Settled observable state matches the model after every operation

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tandem_harness::{ModelWorld, Operation, SimWorld};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    duplicate_percent: u8,
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let rate = f64::from(input.duplicate_percent % 50) / 100.0;
    let mut model = ModelWorld::new();
    let mut real = SimWorld::with_duplicate_rate(input.seed, rate);

    for op in input.ops.iter().take(256) {
        assert_eq!(model.apply(op), real.apply(op), "{op:?}");
        assert_eq!(model.observable_state(), real.observable_state(), "{op:?}");
    }
});
