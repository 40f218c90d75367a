//! Tracing subscriber setup, optionally exporting spans through OpenTelemetry.

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
};
use opentelemetry_stdout::SpanExporter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,animatic=debug";
const VERBOSE_FILTER: &str = "debug";
const SERVICE_NAME: &str = "animatic";

/// How a process reports its logs and spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Fall back to debug-level logs when `RUST_LOG` is unset
    pub verbose: bool,
    /// Also print finished spans to stdout through OpenTelemetry
    pub export_spans: bool,
}

impl TelemetryOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn fallback_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.fallback_filter()))
    }
}

/// Keeps span export alive; flushes pending spans when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard flushes and stops span export"]
pub struct TelemetryGuard {
    exporting: bool,
}

impl TelemetryGuard {
    /// Whether spans are exported.
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

/// Tracer provider that prints every finished span to stdout.
pub fn stdout_tracer_provider() -> TracerProvider {
    TracerProvider::builder()
        .with_simple_exporter(SpanExporter::default())
        .with_id_generator(RandomIdGenerator::default())
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build()
}

/// Install the global tracing subscriber.
///
/// Console logs respect `RUST_LOG` and fall back to
/// [`TelemetryOptions::fallback_filter`]. With `export_spans`, spans also go
/// to an OpenTelemetry stdout exporter until the returned guard is dropped.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_telemetry(options: TelemetryOptions) -> Result<TelemetryGuard, Box<dyn std::error::Error>> {
    let otel_layer = if options.export_spans {
        let provider = stdout_tracer_provider();
        let tracer = provider.tracer(SERVICE_NAME);
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(options.env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .try_init()?;

    Ok(TelemetryGuard {
        exporting: options.export_spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_lowers_fallback_filter() {
        assert_eq!(TelemetryOptions::default().fallback_filter(), "info,animatic=debug");
        let verbose = TelemetryOptions {
            verbose: true,
            ..TelemetryOptions::default()
        };
        assert_eq!(verbose.fallback_filter(), "debug");
    }

    #[test]
    fn test_console_only_guard_does_not_export() {
        let guard = TelemetryGuard { exporting: false };
        assert!(!guard.is_exporting());
    }
}
