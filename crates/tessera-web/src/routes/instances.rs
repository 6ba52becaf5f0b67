//! Widget instance route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tessera_core::MountConfig;
use tessera_engine::{InstanceSummary, WidgetState};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MountResponse {
    pub instance_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReconfigureResponse {
    pub instance_id: Uuid,
    pub restarted: bool,
}

fn not_found(id: Uuid) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Instance not found: {}", id))
}

pub async fn list_instances(State(state): State<AppState>) -> Json<Vec<InstanceSummary>> {
    Json(state.supervisor.list().await)
}

pub async fn mount_instance(
    State(state): State<AppState>,
    Json(config): Json<MountConfig>,
) -> (StatusCode, Json<MountResponse>) {
    let instance_id = state.supervisor.mount(config).await;
    (StatusCode::CREATED, Json(MountResponse { instance_id }))
}

pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WidgetState>, (StatusCode, String)> {
    state
        .supervisor
        .state(id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(id))
}

pub async fn reconfigure_instance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(config): Json<MountConfig>,
) -> Result<Json<ReconfigureResponse>, (StatusCode, String)> {
    let restarted = state
        .supervisor
        .reconfigure(id, config)
        .await
        .ok_or_else(|| not_found(id))?;

    Ok(Json(ReconfigureResponse {
        instance_id: id,
        restarted,
    }))
}

pub async fn unmount_instance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.supervisor.unmount(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
