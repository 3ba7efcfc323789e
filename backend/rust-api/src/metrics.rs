use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Ledger
    pub static ref ANSWERS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_recorded_total",
        "Total number of answers appended to the ledger",
        &["correct"]
    )
    .unwrap();

    pub static ref DUPLICATE_ANSWERS_TOTAL: IntCounter = register_int_counter!(
        "duplicate_answers_total",
        "Answers rejected because the question was already answered in the session"
    )
    .unwrap();

    pub static ref REVIEW_QUEUE_CLEARED_TOTAL: IntCounter = register_int_counter!(
        "review_queue_cleared_total",
        "Number of non-empty review queue clears"
    )
    .unwrap();

    // Selection
    pub static ref BATCHES_SERVED_TOTAL: IntCounter = register_int_counter!(
        "batches_served_total",
        "Total number of question batches served"
    )
    .unwrap();

    pub static ref BATCH_SIZE: Histogram = register_histogram!(
        "batch_size",
        "Number of questions returned per batch",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0]
    )
    .unwrap();

    // Sessions
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "sessions_total",
        "Total number of practice sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sessions_active",
        "Number of currently active sessions"
    )
    .unwrap();

    pub static ref CATALOG_QUESTIONS: IntGauge = register_int_gauge!(
        "catalog_questions",
        "Number of questions in the catalog"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
