use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::Settings;
use crate::handles::*;
use crate::services::{
    Controller, HttpThresholdSource, LogNotifier, ModbusTransport, Notifier, WebhookNotifier,
};

pub fn create_controller(settings: &Arc<Settings>) -> anyhow::Result<Arc<Controller>> {
    let transport = Box::new(ModbusTransport::new(&settings.transport));
    let source = Arc::new(HttpThresholdSource::new(&settings.source)?);

    let notifier: Arc<dyn Notifier> = match &settings.notifier.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url, settings.alert_timeout())?),
        None => {
            tracing::info!("No alert webhook configured, overload alerts go to the log");
            Arc::new(LogNotifier)
        }
    };

    Ok(Arc::new(Controller::new(
        settings.clone(),
        transport,
        source,
        notifier,
    )))
}

pub fn create_app(controller: Arc<Controller>) -> Router {
    Router::new()
        .merge(device_router(DeviceState {
            controller: controller.clone(),
        }))
        .merge(auto_router(AutoState { controller }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
