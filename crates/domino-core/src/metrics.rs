//! `OpenTelemetry` export pipeline and commission award counters.
//!
//! This module is only compiled when the `metrics` Cargo feature is enabled.
//! Traces and metrics go to one OTLP endpoint (e.g. an `OpenTelemetry`
//! Collector). Award outcomes are counted under the `domino` meter.

use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

/// Name of the meter and tracer Domino registers with the global providers.
pub const INSTRUMENTATION_NAME: &str = "domino";

/// Errors that can occur during metrics / tracing pipeline initialisation.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to build an OTLP exporter.
    #[error("failed to build OTLP exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// Failed during `OTel` SDK shutdown or flush.
    #[error("OpenTelemetry SDK error: {0}")]
    Sdk(#[from] opentelemetry_sdk::error::OTelSdkError),
}

/// How a call to award commissions for one triggering event ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// This call claimed the event and wrote its batch.
    Committed,
    /// The event was already awarded; existing rows were returned.
    Replayed,
    /// The batch could not be written.
    Failed,
}

impl AwardOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Replayed => "replayed",
            Self::Failed => "failed",
        }
    }
}

/// Handle that keeps the `OpenTelemetry` providers alive.
///
/// When dropped, the providers are **not** shut down automatically -- call
/// [`MetricsGuard::shutdown`] before exiting so the last award counts and
/// spans are flushed.
pub struct MetricsGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl MetricsGuard {
    /// Tracer provider for bridging `tracing` spans into `OTel`.
    pub const fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// Gracefully shut down both providers, flushing any buffered telemetry.
    ///
    /// # Errors
    ///
    /// Returns an error if either provider fails to shut down cleanly.
    pub fn shutdown(self) -> Result<(), MetricsError> {
        self.tracer_provider.shutdown()?;
        self.meter_provider.shutdown()?;
        Ok(())
    }
}

/// Initialise the `OpenTelemetry` OTLP pipeline for traces **and** metrics.
///
/// * `endpoint` -- OTLP receiver URL, e.g. `"http://localhost:4317"` (gRPC).
///
/// Returns a [`MetricsGuard`] that must outlive every award the process
/// records.
///
/// # Errors
///
/// Returns [`MetricsError`] if the OTLP exporters cannot be constructed.
pub fn init_metrics(endpoint: &str) -> Result<MetricsGuard, MetricsError> {
    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?,
        )
        .build();
    global::set_tracer_provider(tracer_provider.clone());

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(
            opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?,
        )
        .build();
    global::set_meter_provider(meter_provider.clone());

    Ok(MetricsGuard {
        tracer_provider,
        meter_provider,
    })
}

/// Count one award call and the commission rows it wrote.
///
/// Without an installed provider the global no-op meter absorbs the counts.
pub fn record_award(outcome: AwardOutcome, commissions: u64) {
    let meter = global::meter(INSTRUMENTATION_NAME);
    meter
        .u64_counter("domino.awards")
        .with_description("Commission award calls by outcome")
        .build()
        .add(1, &[KeyValue::new("outcome", outcome.as_str())]);
    if commissions > 0 {
        meter
            .u64_counter("domino.commissions.created")
            .with_description("Pending commission rows written")
            .build()
            .add(commissions, &[]);
    }
}
