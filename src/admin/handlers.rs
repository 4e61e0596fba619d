use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::registry::{ServiceSnapshot, ServiceState};
use crate::validation::ConnectorTestResult;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub services: usize,
    pub connected: usize,
}

#[derive(Serialize)]
pub struct ActionResult {
    pub service_id: String,
    pub ok: bool,
    pub state: ServiceState,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let services = state.registry.get_services_status();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        connected: services.iter().filter(|s| s.is_connected).count(),
        services: services.len(),
    })
}

pub async fn get_services(State(state): State<AdminState>) -> Json<Vec<ServiceSnapshot>> {
    Json(state.registry.get_services_status())
}

fn known(state: &AdminState, id: &str) -> Result<(), StatusCode> {
    if state.registry.get_policy(id).is_some() {
        Ok(())
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

pub async fn connect_service(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResult>, StatusCode> {
    known(&state, &id)?;
    let ok = state.registry.connect_service(&id).await;
    Ok(Json(ActionResult {
        state: state.registry.service_state(&id),
        service_id: id,
        ok,
    }))
}

pub async fn disconnect_service(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResult>, StatusCode> {
    known(&state, &id)?;
    let ok = state.registry.disconnect_service(&id).await;
    Ok(Json(ActionResult {
        state: state.registry.service_state(&id),
        service_id: id,
        ok,
    }))
}

pub async fn test_service(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ConnectorTestResult>>, StatusCode> {
    let policy = state.registry.get_policy(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(state.validator.test_connector(&id, &policy.connector).await))
}

pub async fn get_test_results(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Json<Vec<ConnectorTestResult>> {
    Json(state.validator.get_test_results(&id))
}
