use std::sync::Arc;

use actix_web::{web, HttpResponse};
use pulse_models::{
    AddApplicationRequest, ApplicationsResponse, AvailabilityResponse, MutationResponse,
};
use pulse_registry::{RegistryError, RegistryStore};
use validator::Validate;

use crate::errors::ServiceError;
use crate::state::AppState;

/// Node URLs must name their scheme; anything else is almost always a typo.
fn check_url_prefix(raw: &str) -> Result<(), ServiceError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(
            "URLs must start with http:// or https://".to_string(),
        ))
    }
}

/// Mutations write and sync the registry file, so they run on the blocking
/// pool.
async fn mutate_registry<F, R>(state: &AppState, apply: F) -> Result<R, ServiceError>
where
    F: FnOnce(&RegistryStore) -> Result<R, RegistryError> + Send + 'static,
    R: Send + 'static,
{
    let registry = Arc::clone(&state.registry);
    Ok(web::block(move || apply(&*registry)).await??)
}

fn schedule_poll(state: &AppState, name: &str) {
    let engine = state.engine.clone();
    let name = name.to_string();
    tokio::spawn(async move {
        if let Err(e) = engine.poll_now(&name).await {
            tracing::warn!(application = %name, error = %e, "Initial collection failed");
        }
    });
}

pub async fn list_applications(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let registry = state.registry.snapshot()?;
    let url_builder = state.registry.url_builder();

    let mut response = ApplicationsResponse::default();
    for (name, urls) in &registry.direct {
        let bases = urls
            .iter()
            .map(|url| url_builder.base_url(url))
            .collect::<Result<Vec<_>, _>>()?;
        response.direct.insert(name.clone(), bases);
    }
    response.aggregations = registry.aggregations.clone();
    Ok(HttpResponse::Ok().json(response))
}

pub async fn add_application(
    state: web::Data<AppState>,
    request: web::Json<AddApplicationRequest>,
) -> Result<HttpResponse, ServiceError> {
    let request = request.into_inner();
    request.validate()?;
    let name = request.app_name.trim().to_string();

    if request.is_unregister_node() {
        let urls = request.app_urls.as_deref().ok_or_else(|| {
            ServiceError::BadRequest("appUrls is required to unregister nodes".to_string())
        })?;
        check_url_prefix(urls)?;
        let (target, urls) = (name.clone(), urls.to_string());
        let changed =
            mutate_registry(&state, move |registry| registry.unregister_nodes(&target, &urls)).await?;
        if changed {
            if state.registry.entry(&name)?.is_some() {
                state.engine.reset(&name);
                schedule_poll(&state, &name);
            } else {
                state.engine.forget(&name);
            }
        }
        return Ok(HttpResponse::Ok().json(MutationResponse {
            success: changed,
            application: name,
            message: if changed {
                "Nodes unregistered".to_string()
            } else {
                "No matching node".to_string()
            },
        }));
    }

    if let Some(urls) = request.app_urls.as_deref().filter(|u| !u.trim().is_empty()) {
        check_url_prefix(urls)?;
        let (target, urls) = (name.clone(), urls.to_string());
        let registered =
            mutate_registry(&state, move |registry| registry.add_direct_application(&target, &urls))
                .await?;
        state.engine.reset(&name);
        schedule_poll(&state, &name);
        tracing::info!(application = %name, nodes = registered.len(), "Application registered");
        return Ok(HttpResponse::Created().json(MutationResponse {
            success: true,
            application: name,
            message: format!("Registered {} node(s)", registered.len()),
        }));
    }

    if let Some(members) = request.aggregated_apps {
        let target = name.clone();
        let retained =
            mutate_registry(&state, move |registry| registry.add_aggregation(&target, &members))
                .await?;
        state.engine.forget(&name);
        return Ok(HttpResponse::Created().json(MutationResponse {
            success: true,
            application: name,
            message: format!("Aggregates {}", retained.join(",")),
        }));
    }

    Err(ServiceError::BadRequest(
        "Either appUrls or aggregatedApps is required".to_string(),
    ))
}

pub async fn get_application(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let name = path.into_inner();
    if state.registry.entry(&name)?.is_none() {
        return Err(ServiceError::NotFound(format!("Unknown application '{}'", name)));
    }
    if !state.engine.is_data_available(&name) {
        return Err(ServiceError::DataUnavailable(format!(
            "No data collected for '{}'",
            name
        )));
    }
    match state.engine.latest_snapshot(&name) {
        Some(snapshot) => Ok(HttpResponse::Ok().json(snapshot)),
        None => Err(ServiceError::DataUnavailable(format!(
            "No data collected for '{}'",
            name
        ))),
    }
}

pub async fn remove_application(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let name = path.into_inner();
    let target = name.clone();
    if !mutate_registry(&state, move |registry| registry.remove(&target)).await? {
        return Err(ServiceError::NotFound(format!("Unknown application '{}'", name)));
    }
    state.engine.forget(&name);
    Ok(HttpResponse::Ok().json(MutationResponse {
        success: true,
        application: name,
        message: "Application removed".to_string(),
    }))
}

pub async fn get_availability(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let name = path.into_inner();
    let available = state.engine.is_data_available(&name);
    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        application: name,
        available,
    }))
}

pub async fn poll_application(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let name = path.into_inner();
    let summaries = state.engine.poll_application(&name).await?;
    Ok(HttpResponse::Ok().json(summaries))
}

pub fn configure_application_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/applications")
            .route("", web::get().to(list_applications))
            .route("", web::post().to(add_application))
            .route("/{name}", web::get().to(get_application))
            .route("/{name}", web::delete().to(remove_application))
            .route("/{name}/availability", web::get().to(get_availability))
            .route("/{name}/poll", web::post().to(poll_application)),
    );
}
