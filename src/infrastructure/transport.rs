// Builds the configured actuator transport
use crate::application::fan_transport::FanTransport;
use crate::infrastructure::config::{ActuatorKind, ActuatorSettings};
use crate::infrastructure::esphome_rest::EspHomeRestTransport;
use crate::infrastructure::home_assistant::HomeAssistantTransport;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

pub fn build_transport(settings: &ActuatorSettings) -> anyhow::Result<Arc<dyn FanTransport>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.command_timeout_ms))
        .build()
        .context("Failed to build HTTP client")?;

    let transport: Arc<dyn FanTransport> = match settings.kind {
        ActuatorKind::EsphomeRest => Arc::new(EspHomeRestTransport::new(client)),
        ActuatorKind::HomeAssistant => {
            let token = settings
                .token
                .clone()
                .context("actuator.token is required for home_assistant")?;
            Arc::new(HomeAssistantTransport::new(client, token))
        }
    };
    Ok(transport)
}
