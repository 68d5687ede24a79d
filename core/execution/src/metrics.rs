// dryrun/core/execution/src/metrics.rs

// Metrics for tracking session executions
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_gauge, CounterVec, Histogram, IntGauge,
};

pub static SESSION_EXECUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dryrun_session_executions_total",
        "Number of session executions by terminal state and commit outcome",
        &["state", "committed"]
    )
    .expect("register dryrun_session_executions_total")
});

pub static SESSION_GAS_USED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dryrun_session_gas_used",
        "Gas consumed by session executions",
        prometheus::exponential_buckets(1_000.0, 10.0, 8).unwrap_or_default()
    )
    .expect("register dryrun_session_gas_used")
});

pub static ACTIVE_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dryrun_active_sessions", "Number of live sessions")
        .expect("register dryrun_active_sessions")
});

pub static STATE_PATCHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dryrun_state_patches_total",
        "Direct state mutations applied to sessions",
        &["kind"]
    )
    .expect("register dryrun_state_patches_total")
});

pub static VIRTUAL_DEPLOYS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dryrun_virtual_deploys_total",
        "Virtual deploys by outcome",
        &["outcome"]
    )
    .expect("register dryrun_virtual_deploys_total")
});
