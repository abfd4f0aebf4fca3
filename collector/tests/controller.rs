use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use pulse_collector::engine::{CollectError, CollectorEngine, EngineConfig, NodeFetcher};
use pulse_collector::{handlers, AppState};
use pulse_config::CollectorSettings;
use pulse_models::{
    ApplicationSnapshot, ApplicationsResponse, AvailabilityResponse, CounterStats,
    MetricsSnapshot, MutationResponse, PollSummary, TransportFormat,
};
use pulse_registry::{RegistryStore, UrlBuilder};
use serde_json::json;
use tempfile::TempDir;
use url::Url;

/// Hosts named `down` refuse connections; every other host answers.
struct StaticFetcher;

#[async_trait]
impl NodeFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<MetricsSnapshot, CollectError> {
        if url.host_str() == Some("down") {
            return Err(CollectError::Connection("refused".to_string()));
        }
        let mut snapshot = MetricsSnapshot::default();
        snapshot.counters.insert(
            "http".to_string(),
            CounterStats { hits: 3, errors: 0, duration_millis: 30 },
        );
        Ok(snapshot)
    }
}

fn app_state(dir: &TempDir) -> AppState {
    let mut settings = CollectorSettings::default();
    settings.storage_directory = dir.path().to_path_buf();
    settings.dns_lookups_disabled = true;
    let settings = Arc::new(settings);
    let registry = Arc::new(RegistryStore::open(
        settings.registry_file(),
        UrlBuilder::new("/monitoring", TransportFormat::Json),
    ));
    let engine = Arc::new(CollectorEngine::new(
        Arc::clone(&registry),
        Arc::new(StaticFetcher),
        EngineConfig::from_settings(&settings),
    ));
    AppState::new(settings, registry, engine)
}

macro_rules! service {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(handlers::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_register_list_and_remove() {
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir);
    let app = service!(state);

    let req = test::TestRequest::post()
        .uri("/applications")
        .set_json(json!({"appName": "shop", "appUrls": "http://h1:8080/shop,http://h2:8080/shop"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: MutationResponse = test::read_body_json(resp).await;
    assert!(body.success);

    let req = test::TestRequest::post()
        .uri("/applications")
        .set_json(json!({"appName": "all", "aggregatedApps": ["shop", "missing"]}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/applications").to_request();
    let listing: ApplicationsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        listing.direct["shop"],
        vec!["http://h1:8080/shop", "http://h2:8080/shop"]
    );
    assert_eq!(listing.aggregations["all"], vec!["shop"]);

    let req = test::TestRequest::delete().uri("/applications/shop").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::delete().uri("/applications/shop").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/applications").to_request();
    let listing: ApplicationsResponse = test::call_and_read_body_json(&app, req).await;
    assert!(listing.direct.is_empty());
    assert!(listing.aggregations.is_empty());
}

#[actix_web::test]
async fn test_rejects_bad_requests() {
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir);
    let app = service!(state);

    for body in [
        json!({"appName": "shop", "appUrls": "ftp://h1/shop"}),
        json!({"appName": "shop"}),
        json!({"appName": "a,b", "appUrls": "http://h1/a"}),
        json!({"appName": "", "appUrls": "http://h1/a"}),
        json!({"appName": "g", "aggregatedApps": ["nobody"]}),
    ] {
        let req = test::TestRequest::post().uri("/applications").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let error: serde_json::Value = test::read_body_json(resp).await;
        assert!(error["error"].is_string());
        assert!(error["message"].is_string());
    }
    assert!(state.registry.snapshot().unwrap().is_empty());
}

#[actix_web::test]
async fn test_data_unavailable_until_polled() {
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir);
    state.registry.add_direct_application("broken", "http://down/app").unwrap();
    state.registry.add_direct_application("shop", "http://h1/shop").unwrap();
    let app = service!(state);

    let req = test::TestRequest::get().uri("/applications/broken").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SERVICE_UNAVAILABLE);

    let req = test::TestRequest::post().uri("/applications/broken/poll").to_request();
    let summaries: Vec<PollSummary> = test::call_and_read_body_json(&app, req).await;
    assert!(summaries[0].is_failure());

    let req = test::TestRequest::post().uri("/applications/shop/poll").to_request();
    let summaries: Vec<PollSummary> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summaries[0].succeeded(), 1);

    let req = test::TestRequest::get().uri("/applications/shop").to_request();
    let snapshot: ApplicationSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot.counters["http"].hits, 3);

    let req = test::TestRequest::get().uri("/applications/shop/availability").to_request();
    let availability: AvailabilityResponse = test::call_and_read_body_json(&app, req).await;
    assert!(availability.available);

    let req = test::TestRequest::get().uri("/applications/ghost").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    let req = test::TestRequest::post().uri("/applications/ghost/poll").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_unregister_node_action() {
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir);
    state
        .registry
        .add_direct_application("shop", "http://h1/shop,http://h2/shop")
        .unwrap();
    let app = service!(state);

    let req = test::TestRequest::post()
        .uri("/applications")
        .set_json(json!({"appName": "shop", "appUrls": "http://h2/shop", "action": "unregisterNode"}))
        .to_request();
    let body: MutationResponse = test::call_and_read_body_json(&app, req).await;
    assert!(body.success);
    assert_eq!(state.registry.direct_applications().unwrap()["shop"].len(), 1);

    let req = test::TestRequest::post()
        .uri("/applications")
        .set_json(json!({"appName": "shop", "appUrls": "http://h1/shop", "action": "unregisterNode"}))
        .to_request();
    let body: MutationResponse = test::call_and_read_body_json(&app, req).await;
    assert!(body.success);
    assert!(!state.registry.snapshot().unwrap().contains("shop"));
}

#[actix_web::test]
async fn test_health_reports_counts() {
    let dir = TempDir::new().unwrap();
    let state = app_state(&dir);
    state.registry.add_direct_application("shop", "http://h1/shop").unwrap();
    let app = service!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["host"], "localhost");
    assert_eq!(body["address"], "127.0.0.1");
    assert_eq!(body["direct_applications"], 1);
    assert_eq!(body["tracked_applications"], 0);
}

#[actix_web::test]
async fn test_storage_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, "").unwrap();

    let mut settings = CollectorSettings::default();
    settings.storage_directory = blocker;
    let settings = Arc::new(settings);
    let registry = Arc::new(RegistryStore::open(
        settings.registry_file(),
        UrlBuilder::new("/monitoring", TransportFormat::Json),
    ));
    let engine = Arc::new(CollectorEngine::new(
        Arc::clone(&registry),
        Arc::new(StaticFetcher),
        EngineConfig::from_settings(&settings),
    ));
    let state = AppState::new(settings, registry, engine);
    let app = service!(state);

    let req = test::TestRequest::post()
        .uri("/applications")
        .set_json(json!({"appName": "shop", "appUrls": "http://h1/shop"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "Storage error");
}
