// Runtime settings shared between the control loop, actuator and control API
use crate::domain::actuator::ActuatorTarget;
use crate::domain::errors::InvalidConfigError;
use crate::domain::mapping::MappingConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeSettings {
    pub mapping: MappingConfig,
    pub target: ActuatorTarget,
    pub enabled: bool,
}

impl RuntimeSettings {
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        self.mapping.validate()?;
        self.target.validate()
    }
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_fan: Option<u8>,
    pub max_fan: Option<u8>,
    pub rate_gain: Option<f64>,
    pub smoothing_size: Option<usize>,
    pub cooldown_ms: Option<u64>,
    pub ip_address: Option<String>,
    pub entity_id: Option<String>,
    pub enabled: Option<bool>,
}

impl SettingsUpdate {
    fn apply_to(self, current: &RuntimeSettings) -> RuntimeSettings {
        let mut next = current.clone();
        let mapping = &mut next.mapping;
        mapping.min_speed = self.min_speed.unwrap_or(mapping.min_speed);
        mapping.max_speed = self.max_speed.unwrap_or(mapping.max_speed);
        mapping.min_fan = self.min_fan.unwrap_or(mapping.min_fan);
        mapping.max_fan = self.max_fan.unwrap_or(mapping.max_fan);
        mapping.rate_gain = self.rate_gain.unwrap_or(mapping.rate_gain);
        mapping.smoothing_size = self.smoothing_size.unwrap_or(mapping.smoothing_size);

        let target = &mut next.target;
        target.cooldown_ms = self.cooldown_ms.unwrap_or(target.cooldown_ms);
        if let Some(ip) = self.ip_address {
            target.ip_address = ip;
        }
        if let Some(entity) = self.entity_id {
            target.entity_id = entity;
        }

        next.enabled = self.enabled.unwrap_or(next.enabled);
        next
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<RuntimeSettings>>,
}

impl SettingsStore {
    pub fn new(initial: RuntimeSettings) -> Result<Self, InvalidConfigError> {
        initial.validate()?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { tx: Arc::new(tx) })
    }

    pub fn current(&self) -> RuntimeSettings {
        self.tx.borrow().clone()
    }

    /// Validate and apply `update` as a whole. On rejection the previous
    /// settings stay in force. Concurrent updates are serialized by the
    /// channel lock, so none of them is lost.
    pub fn update(&self, update: SettingsUpdate) -> Result<RuntimeSettings, InvalidConfigError> {
        let mut outcome = None;
        self.tx.send_if_modified(|current| {
            let next = update.apply_to(current);
            let verdict = next.validate();
            let applied = verdict.is_ok();
            if applied {
                *current = next.clone();
            }
            outcome = Some(verdict.map(|()| next));
            applied
        });

        match outcome {
            Some(Ok(next)) => {
                tracing::info!("Settings updated: {:?}", next);
                Ok(next)
            }
            Some(Err(e)) => {
                tracing::warn!("Rejected settings update: {}", e);
                Err(e)
            }
            None => Ok(self.current()),
        }
    }

    pub fn toggle_enabled(&self) -> bool {
        let mut enabled = false;
        self.tx.send_modify(|settings| {
            settings.enabled = !settings.enabled;
            enabled = settings.enabled;
        });
        enabled
    }
}
