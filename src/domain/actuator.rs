// Actuator target and connection state
use crate::domain::errors::InvalidConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorTarget {
    pub ip_address: String,
    pub entity_id: String,
    pub cooldown_ms: u64,
}

impl Default for ActuatorTarget {
    fn default() -> Self {
        Self {
            ip_address: "192.168.99.100".to_string(),
            entity_id: "fan".to_string(),
            cooldown_ms: 300,
        }
    }
}

impl ActuatorTarget {
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.ip_address.trim().is_empty() {
            return Err(InvalidConfigError::EmptyField("ip_address"));
        }
        if self.entity_id.trim().is_empty() {
            return Err(InvalidConfigError::EmptyField("entity_id"));
        }
        Ok(())
    }

    /// Whether `other` addresses the same device entity.
    pub fn same_device(&self, other: &ActuatorTarget) -> bool {
        self.ip_address == other.ip_address && self.entity_id == other.entity_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Automatic reconnection gave up; only an explicit reconnect leaves this state.
    Degraded,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Degraded => "degraded",
        };
        f.write_str(name)
    }
}
