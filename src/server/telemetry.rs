use super::ServerError;
use crate::config::TelemetryConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber: env filter, a text or JSON fmt layer and,
/// with the `telemetry` feature and a Jaeger endpoint, trace export.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), ServerError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let json_layer = config.json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .json()
    });
    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true)
    });

    let subscriber = Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    #[cfg(feature = "telemetry")]
    if let Some(endpoint) = &config.jaeger_endpoint {
        let tracer = jaeger::tracer(endpoint)?;
        subscriber
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .try_init()
            .map_err(|e| ServerError::Telemetry(e.to_string()))?;
        tracing::info!(%endpoint, "Telemetry initialized with Jaeger endpoint");
        return Ok(());
    }

    subscriber
        .try_init()
        .map_err(|e| ServerError::Telemetry(e.to_string()))?;
    tracing::debug!("Trace export disabled");
    Ok(())
}

/// Flush pending spans before exit
pub fn shutdown_telemetry(config: &TelemetryConfig) {
    #[cfg(feature = "telemetry")]
    if config.jaeger_endpoint.is_some() {
        opentelemetry::global::shutdown_tracer_provider();
    }
    #[cfg(not(feature = "telemetry"))]
    let _ = config;
}

#[cfg(feature = "telemetry")]
mod jaeger {
    use super::ServerError;
    use opentelemetry::sdk::propagation::TraceContextPropagator;
    use opentelemetry::sdk::{
        trace::{self, RandomIdGenerator, Sampler, Tracer},
        Resource,
    };
    use opentelemetry::{global, KeyValue};
    use std::time::Duration;

    const SERVICE_NAME: &str = "rtc-signaling";

    pub fn tracer(endpoint: &str) -> Result<Tracer, ServerError> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        opentelemetry_jaeger::new_collector_pipeline()
            .with_service_name(SERVICE_NAME)
            .with_endpoint(endpoint)
            .with_isahc()
            .with_trace_config(
                trace::config()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(RandomIdGenerator::default())
                    .with_max_events_per_span(64)
                    .with_max_attributes_per_span(16)
                    .with_resource(Resource::new(vec![
                        KeyValue::new("service.name", SERVICE_NAME),
                        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ])),
            )
            .with_timeout(Duration::from_secs(2))
            .install_batch(opentelemetry::runtime::Tokio)
            .map_err(|e| ServerError::Telemetry(e.to_string()))
    }
}
