//! Telemetry and structured logging for SVG conversions.

use opentelemetry::trace::{Span, TraceError, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};

use crate::conversion::{ConversionJob, ConversionStage};

const TRACER_NAME: &str = "svg2pdf-service";

/// Conversions slower than this are logged as warnings.
const SLOW_CONVERSION_MS: i64 = 5000;

/// Records telemetry for a finished conversion.
///
/// Emits an OpenTelemetry span carrying the request id, final stage, sizes,
/// duration and error (if any). Without an installed tracer provider the span
/// goes to the global no-op tracer.
pub fn record_conversion_telemetry(job: &ConversionJob) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("svg_to_pdf_conversion");

    span.set_attribute(KeyValue::new("request_id", job.request_id.to_string()));
    span.set_attribute(KeyValue::new("stage", job.stage.to_string()));
    span.set_attribute(KeyValue::new("input_bytes", job.input_bytes as i64));

    if let Some(output_bytes) = job.output_bytes {
        span.set_attribute(KeyValue::new("output_bytes", output_bytes as i64));
    }
    if let Some(ref filename) = job.filename {
        span.set_attribute(KeyValue::new("filename", filename.clone()));
    }

    if let Some(duration_ms) = job.duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        if duration_ms > SLOW_CONVERSION_MS {
            warn!(
                request_id = %job.request_id,
                duration_ms = duration_ms,
                "SVG conversion exceeded performance threshold (5000ms)"
            );
        }
    }

    if job.stage == ConversionStage::Failed {
        if let Some(kind) = job.error_kind {
            span.set_attribute(KeyValue::new("error_kind", kind));
        }
        if let Some(ref error) = job.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
        }
    }

    span.end();
}

/// Initializes OpenTelemetry with an OTLP exporter.
///
/// Called once at startup, and only when an OTLP endpoint is configured.
/// `service_name` is reported as the `service.name` resource.
pub fn init_telemetry(endpoint: &str, service_name: &str) -> Result<(), TraceError> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name.to_string()),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    if let Some(provider) = tracer.provider() {
        global::set_tracer_provider(provider);
    }

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}

/// Flushes pending spans. Safe to call when telemetry was never initialized.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}
