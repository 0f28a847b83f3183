// HTTP request handlers
use crate::application::actuator_client::SendOutcome;
use crate::application::settings_store::{RuntimeSettings, SettingsUpdate};
use crate::domain::actuator::ConnectionState;
use crate::domain::live_state::LiveState;
use crate::presentation::app_state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn live_data(State(state): State<Arc<AppState>>) -> Json<LiveState> {
    Json(state.live.snapshot())
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<RuntimeSettings> {
    Json(state.settings.current())
}

pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.settings.update(update) {
        Ok(settings) => {
            state.live.set_enabled(settings.enabled);
            Ok(Json(json!({ "success": true, "config": settings })))
        }
        Err(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "success": false, "error": e.to_string() })),
        )),
    }
}

/// Explicit reconnect: clears the degraded state and tries once right away
pub async fn reconnect(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut actuator = state.actuator.lock().await;
    actuator.request_reconnect();
    let connection = actuator.connect_now().await;
    drop(actuator);

    let snapshot = state.live.snapshot();
    Json(json!({
        "success": connection == ConnectionState::Connected,
        "connection": connection,
        "error": snapshot.last_error,
    }))
}

pub async fn toggle_system(State(state): State<Arc<AppState>>) -> Json<Value> {
    let enabled = state.settings.toggle_enabled();
    state.live.set_enabled(enabled);
    tracing::info!("System {}", if enabled { "enabled" } else { "disabled" });

    if !enabled {
        let outcome = state.actuator.lock().await.force_level(0).await;
        tracing::debug!("Stop on disable: {:?}", outcome);
    }

    Json(json!({ "success": true, "enabled": enabled }))
}

pub async fn force_stop(State(state): State<Arc<AppState>>) -> Json<Value> {
    let outcome = state.actuator.lock().await.force_level(0).await;
    let stopped = outcome == SendOutcome::Delivered;
    Json(json!({
        "success": stopped,
        "message": if stopped { "Fan stopped" } else { "Fan not connected" },
    }))
}
