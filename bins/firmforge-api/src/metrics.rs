// Prometheus metrics for the compile pipeline

use lazy_static::lazy_static;
use prometheus::{register_histogram, register_int_counter_vec, Histogram, IntCounterVec};

lazy_static! {
    /// Compile requests by terminal outcome: success, compile_failed,
    /// rejected, internal_error.
    pub static ref COMPILE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "firmforge_compile_requests_total",
        "Compile requests by terminal outcome",
        &["outcome"]
    )
    .expect("register compile request counter");

    /// Wall-clock duration of compile jobs, including workspace setup and
    /// teardown.
    pub static ref COMPILE_DURATION_SECONDS: Histogram = register_histogram!(
        "firmforge_compile_duration_seconds",
        "Wall-clock duration of compile jobs in seconds",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("register compile duration histogram");
}
