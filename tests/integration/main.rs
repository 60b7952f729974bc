//! End-to-end tests across all layers
//!
//! Builds states the way a planner does and checks equality, hashing, and
//! lifecycle behaviour through the re-exporting `traitstate` crate.

mod planning;
mod scenarios;

/// Routes store tracing into the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
