//! Metrics definitions for apply-path monitoring.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for the fallback writer behind the bulk writer.
pub const WRITER_LABEL: &str = "writer";

/// Counter for rows applied through the streaming copy channel.
pub const APPLY_COPY_ROWS_TOTAL: &str = "cdc_apply_copy_rows_total";

/// Counter for rows applied through the row-by-row fallback path.
pub const APPLY_FALLBACK_ROWS_TOTAL: &str = "cdc_apply_fallback_rows_total";

/// Counter for streaming sessions cancelled by an in-error batch end.
pub const APPLY_SESSIONS_CANCELLED_TOTAL: &str = "cdc_apply_sessions_cancelled_total";

/// Duration of one event application, from routing to acknowledgement.
pub const APPLY_EVENT_DURATION_SECONDS: &str = "cdc_apply_event_duration_seconds";

/// Register apply-path metrics.
///
/// Safe to call multiple times — registration happens only once.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            APPLY_COPY_ROWS_TOTAL,
            Unit::Count,
            "Rows applied through the streaming copy channel, labeled by fallback writer"
        );

        describe_counter!(
            APPLY_FALLBACK_ROWS_TOTAL,
            Unit::Count,
            "Rows applied through the row-by-row fallback path, labeled by fallback writer"
        );

        describe_counter!(
            APPLY_SESSIONS_CANCELLED_TOTAL,
            Unit::Count,
            "Streaming sessions cancelled because their batch ended in error"
        );

        describe_histogram!(
            APPLY_EVENT_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of one event application, labeled by fallback writer"
        );
    });
}
