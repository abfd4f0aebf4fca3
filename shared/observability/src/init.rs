//! Tracing initialization for Pulse services.
//!
//! Subscriber setup with JSON or pretty output, picked by `LOG_FORMAT`.

use std::env;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name for log attribution
    pub service_name: String,
    /// Log format: "json" or "pretty"
    pub format: String,
    /// Log level filter (e.g., "info", "debug", "pulse_collector=debug,info")
    pub level: String,
    /// Whether `RUST_LOG` was explicitly set
    pub level_from_env: bool,
    /// Whether to log span events (enter/exit)
    pub log_spans: bool,
    /// Whether to include file/line in logs
    pub include_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let env_level = env::var("RUST_LOG").ok();
        Self {
            service_name: "pulse".to_string(),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            level_from_env: env_level.is_some(),
            level: env_level.unwrap_or_else(|| "info".to_string()),
            log_spans: env::var("LOG_SPANS").map(|v| v == "true").unwrap_or(false),
            include_location: env::var("LOG_LOCATION").map(|v| v == "true").unwrap_or(false),
        }
    }
}

impl TracingConfig {
    /// Create config for a specific service
    pub fn for_service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Cap the level at `warn` unless `RUST_LOG` asks for something else.
    /// Used when the collector's `log` parameter is off.
    pub fn quiet_unless_overridden(mut self, quiet: bool) -> Self {
        if quiet && !self.level_from_env {
            self.level = "warn".to_string();
        }
        self
    }
}

/// Initialize tracing with the given configuration
///
/// # Example
/// ```ignore
/// use pulse_observability::{init_tracing, TracingConfig};
///
/// init_tracing(TracingConfig::for_service("collector-service"));
/// ```
pub fn init_tracing(config: TracingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.log_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let result = if config.format == "json" {
        let layer = fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_current_span(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(true);

        tracing_subscriber::registry().with(filter).with(layer).try_init()
    } else {
        let layer = fmt::layer()
            .with_span_events(span_events)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_target(true);

        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };

    if result.is_err() {
        // tests and embedders may have installed a subscriber already
        return;
    }

    tracing::info!(
        service = %config.service_name,
        format = %config.format,
        level = %config.level,
        "Tracing initialized"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_service_keeps_defaults() {
        let config = TracingConfig::for_service("collector-service");
        let defaults = TracingConfig::default();

        assert_eq!(config.service_name, "collector-service");
        assert_eq!(config.format, defaults.format);
        assert_eq!(config.level, defaults.level);
    }

    #[test]
    fn test_quiet_caps_level_when_not_overridden() {
        let config = TracingConfig {
            level_from_env: false,
            ..TracingConfig::for_service("test")
        }
        .quiet_unless_overridden(true);
        assert_eq!(config.level, "warn");

        let config = TracingConfig {
            level_from_env: true,
            level: "debug".to_string(),
            ..TracingConfig::for_service("test")
        }
        .quiet_unless_overridden(true);
        assert_eq!(config.level, "debug");
    }
}
