use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use pulse_collector::engine::{ensure_supported, CollectorEngine, EngineConfig, HttpNodeFetcher};
use pulse_collector::{handlers, AppState, PollingScheduler};
use pulse_config::{CollectorSettings, ParameterResolver};
use pulse_observability::{info, init_tracing, observability, TracingConfig};
use pulse_registry::RegistryStore;

const SERVICE_NAME: &str = "collector-service";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let init_file = std::env::var("PULSE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("collector.properties"));
    let resolver = ParameterResolver::from_process(&init_file, std::env::args().skip(1))
        .context("failed to read collector parameters")?;
    let settings = CollectorSettings::from_resolver(&resolver)
        .context("invalid collector configuration")?;

    init_tracing(TracingConfig::for_service(SERVICE_NAME).quiet_unless_overridden(!settings.log_enabled));

    ensure_supported(settings.transport_format)
        .context("transport format cannot be decoded by this collector")?;

    info!(
        storage = %settings.storage_directory.display(),
        host = %settings.host_name(),
        format = %settings.transport_format,
        "🚀 [Collector Service] Starting on {}",
        settings.bind_address
    );

    let settings = Arc::new(settings);
    let registry = Arc::new(RegistryStore::from_settings(&settings));
    let loaded = pulse_observability::log_timed!("registry_load", registry.load_if_absent());
    loaded.with_context(|| format!("failed to load {}", registry.path().display()))?;

    let fetcher = HttpNodeFetcher::from_settings(&settings).context("failed to build HTTP client")?;
    let engine = Arc::new(CollectorEngine::new(
        Arc::clone(&registry),
        Arc::new(fetcher),
        EngineConfig::from_settings(&settings),
    ));

    let scheduler = PollingScheduler::spawn(
        Arc::clone(&engine),
        Arc::clone(&registry),
        settings.resolution,
        settings.workers,
    );

    let state = AppState::new(Arc::clone(&settings), Arc::clone(&registry), engine);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(observability(SERVICE_NAME))
            .configure(handlers::configure_routes)
    })
    .bind(settings.bind_address)
    .with_context(|| format!("failed to bind {}", settings.bind_address))?
    .run();

    let result = server.await;
    scheduler.shutdown().await;
    registry.close();
    info!("[Collector Service] Stopped");
    result.context("HTTP server failed")
}
