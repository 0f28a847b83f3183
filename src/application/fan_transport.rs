// Transport trait for talking to the remote fan
use crate::domain::actuator::ActuatorTarget;
use crate::domain::errors::ActuatorTransportError;
use async_trait::async_trait;

#[async_trait]
pub trait FanTransport: Send + Sync {
    /// Open a session to the device and confirm the fan entity exists
    async fn open(&self, target: &ActuatorTarget) -> Result<(), ActuatorTransportError>;

    /// Set the fan to `level` percent; 0 turns it off
    async fn set_level(&self, target: &ActuatorTarget, level: u8) -> Result<(), ActuatorTransportError>;
}
