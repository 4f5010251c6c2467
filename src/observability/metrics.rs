//! Bootstrap metrics and the diagnostics endpoint.
//!
//! # Metrics
//! - `bootstrap_callbacks_total` (counter): invoked callbacks by phase, outcome
//! - `bootstrap_callback_duration_seconds` (histogram): time spent per callback
//!
//! # Design Decisions
//! - The exporter is only installed when diagnostics are enabled; otherwise
//!   the `metrics` macros are no-ops
//! - The endpoint runs in the background and reports its exit on the
//!   service's exit signal like any listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::exit::{ExitReporter, ServeError};
use crate::lifecycle::phase::Phase;

/// Record one finished callback invocation.
pub fn record_callback(phase: Phase, outcome: &'static str, started: Instant) {
    ::metrics::counter!(
        "bootstrap_callbacks_total",
        "phase" => phase.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    ::metrics::histogram!("bootstrap_callback_duration_seconds", "phase" => phase.as_str())
        .record(started.elapsed().as_secs_f64());
}

/// Install the Prometheus recorder and serve it on `address` in the background.
pub fn spawn_exporter(address: SocketAddr, reporter: ExitReporter) -> Result<(), BuildError> {
    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(address)
        .build()?;

    if ::metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("metrics recorder already installed, diagnostics endpoint will be empty");
    }

    tracing::debug!(address = %address, "starting diagnostics endpoint");

    tokio::spawn(async move {
        let outcome = exporter.await;
        tracing::error!(result = ?outcome, "diagnostics endpoint exited");
        reporter.report(Err(ServeError::Diagnostics(format!("{outcome:?}"))));
    });

    Ok(())
}
