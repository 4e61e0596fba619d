//! Admin API for operators.
//!
//! # Routes
//! ```text
//! GET  /admin/status                      version and service counts
//! GET  /admin/services                    snapshot of every service
//! POST /admin/services/{id}/connect       connect (or re-probe) a service
//! POST /admin/services/{id}/disconnect    disconnect a service
//! POST /admin/services/{id}/test          run the probe sequence
//! GET  /admin/services/{id}/tests         latest probe results
//! ```
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::registry::ConnectorRegistry;
use crate::validation::ConnectorValidator;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: ConnectorRegistry,
    pub validator: Arc<ConnectorValidator>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(registry: ConnectorRegistry, validator: Arc<ConnectorValidator>, api_key: &str) -> Self {
        Self {
            registry,
            validator,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .route("/admin/services/{id}/connect", post(connect_service))
        .route("/admin/services/{id}/disconnect", post(disconnect_service))
        .route("/admin/services/{id}/test", post(test_service))
        .route("/admin/services/{id}/tests", get(get_test_results))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
