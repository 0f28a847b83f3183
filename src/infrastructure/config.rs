use crate::application::actuator_client::ActuatorOptions;
use crate::application::settings_store::RuntimeSettings;
use crate::domain::actuator::{ActuatorTarget, DEFAULT_MAX_RECONNECT_ATTEMPTS};
use crate::domain::mapping::MappingConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub actuator: ActuatorSettings,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    pub bind_addr: SocketAddr,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 4444)),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    pub bind_addr: SocketAddr,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    #[default]
    EsphomeRest,
    HomeAssistant,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActuatorSettings {
    pub kind: ActuatorKind,
    pub ip_address: String,
    pub entity_id: String,
    pub cooldown_ms: u64,
    pub command_timeout_ms: u64,
    pub max_reconnect_attempts: u32,
    /// Bearer token, Home Assistant only
    pub token: Option<String>,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        let target = ActuatorTarget::default();
        Self {
            kind: ActuatorKind::default(),
            ip_address: target.ip_address,
            entity_id: target.entity_id,
            cooldown_ms: target.cooldown_ms,
            command_timeout_ms: 1500,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            token: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            mapping: self.mapping.clone(),
            target: ActuatorTarget {
                ip_address: self.actuator.ip_address.clone(),
                entity_id: self.actuator.entity_id.clone(),
                cooldown_ms: self.actuator.cooldown_ms,
            },
            enabled: self.enabled,
        }
    }

    pub fn actuator_options(&self) -> ActuatorOptions {
        ActuatorOptions {
            max_reconnect_attempts: self.actuator.max_reconnect_attempts.max(1),
            command_timeout: Duration::from_millis(self.actuator.command_timeout_ms),
        }
    }
}

/// Load `config/bridge.*` (optional) overlaid with `BRIDGE__SECTION__KEY`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/bridge").required(false))
        .add_source(
            config::Environment::with_prefix("BRIDGE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
