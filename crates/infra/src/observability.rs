use std::sync::OnceLock;

use anyhow::Result;
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const REALTIME_EVENTS_TOTAL: &str = "sewa_contact_realtime_events_total";
const SESSION_RESYNC_TOTAL: &str = "sewa_contact_session_resync_total";
const NOTIFICATIONS_TOTAL: &str = "sewa_contact_notifications_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

pub fn register_realtime_event(change: &str) {
    counter!(
        REALTIME_EVENTS_TOTAL,
        "change" => change.to_string()
    )
    .increment(1);
}

pub fn register_session_resync(reason: &str, result: &str) {
    counter!(
        SESSION_RESYNC_TOTAL,
        "reason" => reason.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

pub fn register_notification(outcome: &str) {
    counter!(
        NOTIFICATIONS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
