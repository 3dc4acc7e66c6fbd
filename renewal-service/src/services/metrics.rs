//! Metrics module for renewal-service.
//! Provides Prometheus metrics for renewal handlers and schedule changes.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram, register_int_counter_vec, Encoder, Histogram,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Extra intervals the calculator needed to move a stale date into the future
pub static CATCH_UP_ITERATIONS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(histogram_opts!(
        "renewal_next_payment_catch_up_iterations",
        "Catch-up iterations per next payment calculation",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0]
    ))
    .expect("Failed to register CATCH_UP_ITERATIONS")
});

/// Handler invocations counter
pub static HANDLER_INVOCATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Schedule advance outcomes counter
pub static SCHEDULE_ADVANCES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Calculation errors counter for alerting
pub static CALCULATION_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    HANDLER_INVOCATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "renewal_handler_invocations_total",
                "Total handler invocations by host event"
            ),
            &["handler"]
        )
        .expect("Failed to register HANDLER_INVOCATIONS_TOTAL")
    });

    SCHEDULE_ADVANCES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "renewal_schedule_advances_total",
                "Total payment completions by schedule advance outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register SCHEDULE_ADVANCES_TOTAL")
    });

    CALCULATION_ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "renewal_calculation_errors_total",
                "Total next payment calculation errors by type"
            ),
            &["error_type"]
        )
        .expect("Failed to register CALCULATION_ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*CATCH_UP_ITERATIONS;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}

/// Record a handler invocation.
pub fn record_handler_invocation(handler: &str) {
    if let Some(counter) = HANDLER_INVOCATIONS_TOTAL.get() {
        counter.with_label_values(&[handler]).inc();
    }
}

/// Record the outcome of a payment completion.
pub fn record_schedule_advance(outcome: &str) {
    if let Some(counter) = SCHEDULE_ADVANCES_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a calculation error.
pub fn record_calculation_error(error_type: &str) {
    if let Some(counter) = CALCULATION_ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type]).inc();
    }
}

/// Record catch-up iterations of a successful calculation.
pub fn record_catch_up_iterations(iterations: u32) {
    CATCH_UP_ITERATIONS.observe(f64::from(iterations));
}
