//! Logging and optional OpenTelemetry export
//!
//! `RUST_LOG` filters (default `gdkbridge=info`); `GDKBRIDGE_LOG_FORMAT=json`
//! switches to JSON lines. With the `telemetry` feature and
//! `OTEL_EXPORTER_OTLP_ENDPOINT` set, spans are also exported over OTLP.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("gdkbridge=info"))?)
}

pub fn init_tracing() -> Result<()> {
    let json = std::env::var("GDKBRIDGE_LOG_FORMAT").is_ok_and(|f| f == "json");
    let format: BoxedLayer = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().pretty().boxed()
    };

    let mut layers: Vec<BoxedLayer> = vec![format.with_filter(env_filter()?).boxed()];
    if let Some(otel) = otel_layer()? {
        layers.push(otel.with_filter(env_filter()?).boxed());
    }
    tracing_subscriber::registry().with(layers).try_init()?;

    if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() && cfg!(not(feature = "telemetry")) {
        tracing::warn!("OTEL_EXPORTER_OTLP_ENDPOINT set but the 'telemetry' feature is not enabled");
    }
    Ok(())
}

#[cfg(not(feature = "telemetry"))]
fn otel_layer() -> Result<Option<BoxedLayer>> {
    Ok(None)
}

#[cfg(feature = "telemetry")]
fn otel_layer() -> Result<Option<BoxedLayer>> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok(None);
    };
    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "gdkbridge".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.clone(),
        )]))
        .build();
    let tracer = provider.tracer(service_name);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer).boxed()))
}
