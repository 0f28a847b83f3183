// Main entry point - Dependency injection and task wiring
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::{Mutex, watch};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::actuator_client::ActuatorClient;
use crate::application::actuator_worker::run_actuator_worker;
use crate::application::control_loop::ControlLoop;
use crate::application::live_state_store::LiveStateStore;
use crate::application::settings_store::SettingsStore;
use crate::application::telemetry_receiver::TelemetryReceiver;
use crate::domain::actuator::ConnectionState;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::transport::build_transport;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    force_stop, get_config, health_check, live_data, reconnect, toggle_system, update_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let app_config = load_app_config()?;
    let settings = SettingsStore::new(app_config.runtime_settings())?;
    let live = LiveStateStore::new(app_config.enabled);

    // Actuator side
    let transport = build_transport(&app_config.actuator)?;
    let mut client = ActuatorClient::new(
        transport,
        settings.clone(),
        live.clone(),
        app_config.actuator_options(),
    );
    match client.connect_now().await {
        ConnectionState::Connected => tracing::info!("Fan connected"),
        state => tracing::warn!(
            "Fan not connected at startup ({}, {} failed attempts), will retry on demand",
            state,
            client.failed_attempts()
        ),
    }
    let actuator = Arc::new(Mutex::new(client));

    // Telemetry side; a port we cannot bind is fatal
    let (level_tx, level_rx) = watch::channel(None);
    let control = ControlLoop::new(settings.clone(), live.clone());
    let receiver =
        TelemetryReceiver::bind(app_config.telemetry.bind_addr, control, level_tx).await?;
    tracing::info!("Monitoring OutGauge telemetry on {}", receiver.local_addr()?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let receiver_task = tokio::spawn(receiver.run(shutdown_rx.clone()));
    let worker_task = tokio::spawn(run_actuator_worker(
        actuator.clone(),
        level_rx,
        shutdown_rx.clone(),
    ));

    let state = Arc::new(AppState {
        settings,
        live,
        actuator,
    });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/live", get(live_data))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/reconnect", post(reconnect))
        .route("/api/toggle", post(toggle_system))
        .route("/api/force-stop", post(force_stop))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Control API on http://{}", app_config.http.bind_addr);
    let listener = tokio::net::TcpListener::bind(app_config.http.bind_addr).await?;

    let mut http_shutdown = shutdown_rx;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = http_shutdown.wait_for(|stop| *stop).await;
    });
    let server_task = tokio::spawn(async move { server.await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(true);

    receiver_task.await?;
    worker_task.await?;
    server_task.await??;
    Ok(())
}
