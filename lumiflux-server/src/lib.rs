use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app::{create_app, create_controller};
use crate::configs::Settings;

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod services;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let controller = create_controller(settings)?;

    if let Err(e) = controller.calibrate().await {
        tracing::warn!(
            "Calibration failed, keeping max flux at {}: {}",
            settings.transport.default_max_flux,
            e
        );
    }

    let app = create_app(controller.clone());

    let ip_addr = settings.server.host.parse::<IpAddr>()?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("listening on {:?}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = controller.shutdown().await;
    if report.failed.is_empty() {
        tracing::info!("All {} devices disabled", report.disabled.len());
    } else {
        tracing::warn!("Devices {:?} could not be disabled at shutdown", report.failed);
    }

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
