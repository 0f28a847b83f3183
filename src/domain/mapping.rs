// Speed to fan-level mapping with rate compensation
use crate::domain::errors::InvalidConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub min_speed: f64,
    pub max_speed: f64,
    pub min_fan: u8,
    pub max_fan: u8,
    /// 0..=100 dial scaling the derivative term.
    pub rate_gain: f64,
    pub smoothing_size: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            min_speed: 0.0,
            max_speed: 300.0,
            min_fan: 0,
            max_fan: 100,
            rate_gain: 0.0,
            smoothing_size: 3,
        }
    }
}

impl MappingConfig {
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if !self.min_speed.is_finite() || !self.max_speed.is_finite() {
            return Err(InvalidConfigError::NonFiniteSpeed);
        }
        if self.max_speed <= self.min_speed {
            return Err(InvalidConfigError::DegenerateSpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.min_fan > 100 {
            return Err(InvalidConfigError::FanBoundOutOfRange {
                field: "min_fan",
                value: self.min_fan,
            });
        }
        if self.max_fan > 100 {
            return Err(InvalidConfigError::FanBoundOutOfRange {
                field: "max_fan",
                value: self.max_fan,
            });
        }
        if self.min_fan > self.max_fan {
            return Err(InvalidConfigError::InvertedFanRange {
                min: self.min_fan,
                max: self.max_fan,
            });
        }
        if !(0.0..=100.0).contains(&self.rate_gain) {
            return Err(InvalidConfigError::RateGainOutOfRange(self.rate_gain));
        }
        if self.smoothing_size < 1 {
            return Err(InvalidConfigError::EmptySmoothingWindow);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanLevel {
    pub level: u8,
    /// Compensation actually applied after clamping, in fan-level points.
    pub compensation: f64,
}

/// Map a speed and its derivative onto a fan level. `config` must have passed
/// [`MappingConfig::validate`].
pub fn compute_level(speed_kmh: f64, derivative: f64, config: &MappingConfig) -> FanLevel {
    let min_fan = f64::from(config.min_fan);
    let max_fan = f64::from(config.max_fan);

    let ratio = (speed_kmh - config.min_speed) / (config.max_speed - config.min_speed);
    let base = (ratio * (max_fan - min_fan) + min_fan).clamp(min_fan, max_fan);

    let comp_term = derivative * (config.rate_gain / 100.0);
    let level = (base + comp_term).round().clamp(min_fan, max_fan);

    FanLevel {
        level: level as u8,
        compensation: level - base.round(),
    }
}
