//! Shared tracing/logging initialization.
//!
//! Sets up `tracing_subscriber` with an env-filter and optional JSON output,
//! optionally bridged to OpenTelemetry when the `metrics` feature is on.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Handle returned by [`init_tracing_with_metrics`].
///
/// Without the `metrics` feature this is a unit placeholder.
#[cfg(feature = "metrics")]
pub type TelemetryGuard = Option<crate::metrics::MetricsGuard>;
#[cfg(not(feature = "metrics"))]
pub type TelemetryGuard = ();

fn env_filter(default_filter: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    )
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"domino=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter(default_filter));
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Initialise tracing and, when an endpoint is given and the `metrics`
/// feature is compiled in, the OTLP exporter pipeline.
///
/// Keep the returned guard alive for the process lifetime.
#[cfg(feature = "metrics")]
pub fn init_tracing_with_metrics(
    default_filter: &str,
    log_json: bool,
    metrics_endpoint: Option<&str>,
) -> TelemetryGuard {
    use opentelemetry::trace::TracerProvider as _;

    let Some(endpoint) = metrics_endpoint else {
        init_tracing(default_filter, log_json);
        return None;
    };

    let guard = match crate::metrics::init_metrics(endpoint) {
        Ok(guard) => guard,
        Err(e) => {
            init_tracing(default_filter, log_json);
            tracing::warn!(error = %e, endpoint, "OpenTelemetry disabled");
            return None;
        }
    };

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(guard.tracer_provider().tracer(crate::metrics::INSTRUMENTATION_NAME));
    let registry = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(otel_layer);
    if log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    tracing::info!(endpoint, "OpenTelemetry export enabled");
    Some(guard)
}

/// Initialise tracing; the metrics endpoint is ignored without the
/// `metrics` feature.
#[cfg(not(feature = "metrics"))]
pub fn init_tracing_with_metrics(
    default_filter: &str,
    log_json: bool,
    _metrics_endpoint: Option<&str>,
) -> TelemetryGuard {
    init_tracing(default_filter, log_json);
}
