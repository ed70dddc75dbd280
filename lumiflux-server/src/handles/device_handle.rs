use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use lumiflux_api::{
    ApplyRequest, ApplyResponse, CalibrationResponse, CommandResponse, DeviceId, DisableResponse,
    FleetApplyResponse, FleetSnapshot, SelectRequest,
};

use crate::errors::ApiError;
use crate::services::Controller;

#[derive(Clone)]
pub struct DeviceState {
    pub controller: Arc<Controller>,
}

pub fn device_router(state: DeviceState) -> Router {
    Router::new()
        .route("/api/devices", get(get_devices))
        .route("/api/devices/select", post(select_device))
        .route("/api/devices/apply", post(apply_selected))
        .route("/api/devices/:device_id/apply", post(apply_device))
        .route("/api/devices/:device_id/disable", post(disable_device))
        .route("/api/fleet/apply", post(apply_fleet))
        .route("/api/fleet/disable", post(disable_fleet))
        .route("/api/fleet/calibrate", post(calibrate_fleet))
        .with_state(state)
}

pub async fn get_devices(State(state): State<DeviceState>) -> Json<FleetSnapshot> {
    Json(state.controller.snapshot().await)
}

pub async fn select_device(
    State(state): State<DeviceState>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.controller.select_device(body.device_id).await?;

    Ok(Json(CommandResponse {
        message: format!("Device {} selected", body.device_id),
    }))
}

pub async fn apply_selected(
    State(state): State<DeviceState>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let applied = state.controller.apply_selected(body.percent).await?;

    Ok(Json(applied.into()))
}

pub async fn apply_device(
    State(state): State<DeviceState>,
    Path(device_id): Path<DeviceId>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let applied = state.controller.apply_percent(device_id, body.percent).await?;

    Ok(Json(applied.into()))
}

pub async fn disable_device(
    State(state): State<DeviceState>,
    Path(device_id): Path<DeviceId>,
) -> Result<Json<CommandResponse>, ApiError> {
    state.controller.disable_device(device_id).await?;

    Ok(Json(CommandResponse {
        message: format!("Device {} disabled", device_id),
    }))
}

pub async fn apply_fleet(
    State(state): State<DeviceState>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<FleetApplyResponse>, ApiError> {
    let applied = state.controller.apply_percent_all(body.percent).await?;

    Ok(Json(FleetApplyResponse {
        devices: applied.into_iter().map(ApplyResponse::from).collect(),
    }))
}

pub async fn disable_fleet(State(state): State<DeviceState>) -> Json<DisableResponse> {
    Json(state.controller.disable_all().await)
}

pub async fn calibrate_fleet(
    State(state): State<DeviceState>,
) -> Result<Json<CalibrationResponse>, ApiError> {
    let max_flux = state.controller.calibrate().await?;

    Ok(Json(CalibrationResponse { max_flux }))
}
