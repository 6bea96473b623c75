//! Logging and tracing setup.
//!
//! The subscriber is built from the loaded configuration rather than from
//! process-wide defaults, so the level and output format travel with the
//! config like every other setting.

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use super::{config::Config, types::Res};

/// Keeps the span exporter alive; flushes it when dropped.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            let _ = provider.shutdown();
        }
    }
}

/// Resolve the filter directive from the configured level and CLI verbosity.
///
/// Any `-v` flag wins over the configured level:
/// - No flag: the configured level
/// - -v: DEBUG level
/// - -vv or more: TRACE level
pub fn level_directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber.
pub fn init(config: &Config, verbose: u8) -> Res<TelemetryGuard> {
    // Construct the level filter.

    let filter = EnvFilter::try_new(level_directive(&config.log_level, verbose))?;

    // Prepare the log layers (exactly one is active).

    let stdout = (!config.log_json).then(|| {
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_ansi(true)
            .with_level(true)
            .with_file(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
    });

    let json = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().with_current_span(true).with_span_list(false).with_target(true));

    // Prepare the otlp layer.

    let (otel, provider) = if config.otlp_enabled {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let provider = SdkTracerProvider::builder().with_simple_exporter(exporter).build();
        let tracer = provider.tracer("slack-rag-bot");

        (Some(tracing_opentelemetry::layer().with_tracer(tracer)), Some(provider))
    } else {
        (None, None)
    };

    tracing_subscriber::registry().with(otel).with(filter).with(stdout).with(json).try_init()?;

    Ok(TelemetryGuard { provider })
}
