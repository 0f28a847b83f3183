// Read-only snapshot of what the bridge is doing right now
use super::actuator::ConnectionState;
use super::telemetry::TelemetrySample;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveState {
    pub last_sample: Option<TelemetrySample>,
    pub last_level: Option<u8>,
    pub compensation: f64,
    pub enabled: bool,
    pub connection: ConnectionState,
    pub failed_attempts: u32,
    pub last_error: Option<String>,
    pub manual_reconnect_required: bool,
}
