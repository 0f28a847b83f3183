// Application state for HTTP handlers
use crate::application::actuator_client::ActuatorClient;
use crate::application::live_state_store::LiveStateStore;
use crate::application::settings_store::SettingsStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub settings: SettingsStore,
    pub live: LiveStateStore,
    pub actuator: Arc<Mutex<ActuatorClient>>,
}
