//! Prometheus metrics.
//!
//! Per-item failures (dropped tracks, failed segment downloads) never
//! surface in served playlists, so they are counted here.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the global Prometheus recorder. Call once from `main`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "iptv_proxy_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("iptv_proxy_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_origin_error() {
    counter!("iptv_proxy_origin_errors_total").increment(1);
}

pub fn record_track_dropped() {
    counter!("iptv_proxy_tracks_dropped_total").increment(1);
}

pub fn record_segment_download(success: bool) {
    let outcome = if success { "ok" } else { "failed" };
    counter!("iptv_proxy_segment_downloads_total", "outcome" => outcome).increment(1);
}

pub fn record_segment_batch(segments: usize, start: Instant) {
    histogram!("iptv_proxy_segment_batch_size").record(segments as f64);
    histogram!("iptv_proxy_segment_batch_duration_seconds").record(start.elapsed().as_secs_f64());
}
