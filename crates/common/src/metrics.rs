use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "household_request_transitions_total",
        "Service request transitions applied, by action",
        &["action"]
    )
    .expect("register request_transitions_total")
});

pub static TRANSITION_CONFLICTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "household_request_transition_conflicts_total",
        "Transitions lost to a concurrent writer"
    )
    .expect("register request_transition_conflicts_total")
});

pub static REVIEWS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "household_reviews_total",
        "Reviews stored"
    )
    .expect("register reviews_total")
});

pub static JOB_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "household_job_runs_total",
        "Background job runs, by job and outcome",
        &["job", "outcome"]
    )
    .expect("register job_runs_total")
});

pub static EMAILS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "household_emails_total",
        "Notification emails, by outcome",
        &["outcome"]
    )
    .expect("register emails_total")
});

pub fn encode_metrics() -> (u16, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (500, format!("metrics encode error: {e}"));
    }
    (200, String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        TRANSITIONS_TOTAL.with_label_values(&["accept"]).inc();
        let (status, body) = encode_metrics();
        assert_eq!(status, 200);
        assert!(body.contains("household_request_transitions_total"));
    }
}
