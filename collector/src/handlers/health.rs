use actix_web::{web, HttpResponse};

use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let registry = state.registry.snapshot()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "collector-service",
        "host": state.settings.host_name(),
        "address": state.settings.host_address(),
        "direct_applications": registry.direct.len(),
        "aggregation_applications": registry.aggregations.len(),
        "tracked_applications": state.engine.tracked_applications(),
        "timestamp": chrono::Utc::now()
    })))
}
