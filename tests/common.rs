//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use kahn::cluster::coordinator::Coordinator;
use kahn::cluster::programs::ProgramHost;
use kahn::core::config::Config;
use kahn::core::runtime::Runtime;
use kahn::lattice::registry::LatticeRegistry;
use kahn::store::value::Datum;
use std::sync::Arc;

/// Initialize a tracing subscriber honoring `RUST_LOG`, once per test
/// binary. Subsequent calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a configuration with the given partition count.
pub fn config_with_partitions(partitions: u32) -> Config {
    let mut config = Config::default();
    config.store.partitions = partitions;
    config
}

/// Start a runtime with defaults. Must run inside a tokio runtime.
pub fn start_runtime(partitions: u32) -> (Runtime, Coordinator) {
    init_tracing();
    let mut runtime = Runtime::new(config_with_partitions(partitions)).expect("valid config");
    let coordinator = runtime.start().expect("runtime starts");
    (runtime, coordinator)
}

/// Start a runtime with an explicit program host.
pub fn start_runtime_with_programs(
    partitions: u32,
    programs: Arc<dyn ProgramHost>,
) -> (Runtime, Coordinator) {
    init_tracing();
    let mut runtime = Runtime::with_parts(
        config_with_partitions(partitions),
        Arc::new(LatticeRegistry::with_defaults()),
        programs,
    )
    .expect("valid config");
    let coordinator = runtime.start().expect("runtime starts");
    (runtime, coordinator)
}

/// Poll partition stats until the total parked waiter count reaches `n`.
pub async fn wait_for_parked(coordinator: &Coordinator, n: usize) {
    for _ in 0..1000 {
        let stats = coordinator.stats().await.expect("stats");
        if stats.iter().map(|s| s.parked_waiters).sum::<usize>() >= n {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {n} parked waiters");
}

/// Poll partition stats until a lazy cell appears.
pub async fn wait_for_lazy(coordinator: &Coordinator, n: usize) {
    for _ in 0..1000 {
        let stats = coordinator.stats().await.expect("stats");
        if stats.iter().map(|s| s.lazy_cells).sum::<usize>() >= n {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {n} lazy cells");
}

/// Grow-only counter state with a single replica entry.
pub fn counter(replica: &str, count: u64) -> Datum {
    Datum::map([(replica.to_string(), Datum::Uint(count))])
}
