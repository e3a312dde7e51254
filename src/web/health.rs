//! Liveness endpoint for load balancers and container health checks

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

/// Always 200 while the process serves requests; the database is not queried
pub async fn health_check(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy",
        service: state.config.app.name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
