use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use lumiflux_api::AutoControlStatus;

use crate::services::Controller;

#[derive(Clone)]
pub struct AutoState {
    pub controller: Arc<Controller>,
}

pub fn auto_router(state: AutoState) -> Router {
    Router::new()
        .route("/api/auto", get(get_status))
        .route("/api/auto/arm", post(arm))
        .route("/api/auto/disarm", post(disarm))
        .with_state(state)
}

pub async fn get_status(State(state): State<AutoState>) -> Json<AutoControlStatus> {
    Json(state.controller.auto_control_status())
}

pub async fn arm(State(state): State<AutoState>) -> Json<AutoControlStatus> {
    if !state.controller.arm_auto_control().await {
        tracing::debug!("Auto control already running");
    }

    Json(state.controller.auto_control_status())
}

pub async fn disarm(State(state): State<AutoState>) -> Json<AutoControlStatus> {
    state.controller.disarm_auto_control();

    Json(state.controller.auto_control_status())
}
