// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};

// Metrics from the annotation client
pub static REQUESTS_ATTEMPTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_requests_attempted_total",
        "Total number of request attempts sent to the completion endpoint."
    )
    .expect("Failed to register REQUESTS_ATTEMPTED_TOTAL counter")
});

pub static REQUEST_RETRIES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_request_retries_total",
        "Total number of retries scheduled after a transient failure."
    )
    .expect("Failed to register REQUEST_RETRIES_TOTAL counter")
});

pub static REQUEST_TIMEOUTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_request_timeouts_total",
        "Total number of request attempts that hit the per-request timeout."
    )
    .expect("Failed to register REQUEST_TIMEOUTS_TOTAL counter")
});

pub static ITEMS_LABELLED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_items_labelled_total",
        "Total number of items that received a recognized sentiment label."
    )
    .expect("Failed to register ITEMS_LABELLED_TOTAL counter")
});

pub static ITEMS_UNRECOGNIZED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_items_unrecognized_total",
        "Total number of items whose reply matched no known label."
    )
    .expect("Failed to register ITEMS_UNRECOGNIZED_TOTAL counter")
});

pub static ITEMS_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_items_failed_total",
        "Total number of items that failed after retries or on a non-retryable error."
    )
    .expect("Failed to register ITEMS_FAILED_TOTAL counter")
});

pub static REQUESTS_IN_FLIGHT: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "annotator_requests_in_flight",
        "Number of admission slots currently held."
    )
    .expect("Failed to register REQUESTS_IN_FLIGHT gauge")
});

pub static REQUEST_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "annotator_request_duration_seconds",
        "Histogram of single request attempt latencies (slot held to response or timeout)."
    )
    .expect("Failed to register REQUEST_DURATION_SECONDS histogram")
});

// Metrics from the batch orchestrator
pub static BATCHES_COMPLETED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "orchestrator_batches_completed_total",
        "Total number of batches that fully resolved."
    )
    .expect("Failed to register BATCHES_COMPLETED_TOTAL counter")
});

pub static SEGMENTATION_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "orchestrator_segmentation_errors_total",
        "Total number of items whose text could not be segmented."
    )
    .expect("Failed to register SEGMENTATION_ERRORS_TOTAL counter")
});
