// Per-sample control step: smoothing, mapping, live state
use crate::application::live_state_store::LiveStateStore;
use crate::application::settings_store::SettingsStore;
use crate::domain::mapping::{FanLevel, compute_level};
use crate::domain::smoothing::SmoothingWindow;
use crate::domain::telemetry::TelemetrySample;
use tokio::time::Instant;

pub struct ControlLoop {
    window: SmoothingWindow,
    settings: SettingsStore,
    live: LiveStateStore,
}

impl ControlLoop {
    pub fn new(settings: SettingsStore, live: LiveStateStore) -> Self {
        let window = SmoothingWindow::new(settings.current().mapping.smoothing_size);
        Self {
            window,
            settings,
            live,
        }
    }

    /// Run one cycle for `sample` observed at `at` and return the target level.
    pub fn process(&mut self, sample: TelemetrySample, at: Instant) -> u8 {
        let settings = self.settings.current();
        if self.window.capacity() != settings.mapping.smoothing_size {
            tracing::debug!(
                "Smoothing window resized {} -> {}",
                self.window.capacity(),
                settings.mapping.smoothing_size
            );
            self.window.set_capacity(settings.mapping.smoothing_size);
        }
        let derivative = self.window.push(sample.speed_kmh, at);

        let FanLevel { level, compensation } = if settings.enabled {
            compute_level(sample.speed_kmh, derivative, &settings.mapping)
        } else {
            FanLevel {
                level: 0,
                compensation: 0.0,
            }
        };

        tracing::debug!(
            "Vehicle: {:.1} km/h | d/dt {:.1} | Fan: {}%{}",
            sample.speed_kmh,
            derivative,
            level,
            if settings.enabled { "" } else { " (DISABLED)" }
        );

        self.live.record_cycle(sample, level, compensation, settings.enabled);
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::settings_store::{RuntimeSettings, SettingsUpdate};
    use crate::domain::actuator::ActuatorTarget;
    use crate::domain::mapping::MappingConfig;
    use chrono::Utc;
    use std::time::Duration;

    fn setup(rate_gain: f64) -> (ControlLoop, SettingsStore, LiveStateStore) {
        let settings = SettingsStore::new(RuntimeSettings {
            mapping: MappingConfig {
                rate_gain,
                ..MappingConfig::default()
            },
            target: ActuatorTarget::default(),
            enabled: true,
        })
        .unwrap();
        let live = LiveStateStore::new(true);
        (ControlLoop::new(settings.clone(), live.clone()), settings, live)
    }

    fn sample(speed: f64) -> TelemetrySample {
        TelemetrySample::new(speed, Utc::now())
    }

    #[test]
    fn test_cycle_updates_live_state() {
        let (mut control, _, live) = setup(0.0);
        assert_eq!(control.process(sample(150.0), Instant::now()), 50);

        let snapshot = live.snapshot();
        assert_eq!(snapshot.last_level, Some(50));
        assert_eq!(snapshot.last_sample.unwrap().speed_kmh, 150.0);
    }

    #[test]
    fn test_acceleration_raises_level() {
        let (mut control, _, live) = setup(50.0);
        let t0 = Instant::now();

        // first sample has no derivative
        assert_eq!(control.process(sample(100.0), t0), 33);
        // +20 km/h over 1s at gain 50 adds 10 points
        let level = control.process(sample(120.0), t0 + Duration::from_secs(1));
        assert_eq!(level, 50);
        assert_eq!(live.snapshot().compensation, 10.0);
    }

    #[test]
    fn test_disabled_forces_zero() {
        let (mut control, settings, live) = setup(0.0);
        settings.toggle_enabled();

        assert_eq!(control.process(sample(250.0), Instant::now()), 0);
        assert!(!live.snapshot().enabled);
    }

    #[test]
    fn test_settings_changes_apply_next_cycle() {
        let (mut control, settings, _) = setup(0.0);
        let t0 = Instant::now();
        assert_eq!(control.process(sample(150.0), t0), 50);

        settings
            .update(SettingsUpdate {
                max_speed: Some(150.0),
                min_fan: Some(10),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(control.process(sample(150.0), t0 + Duration::from_millis(50)), 100);
    }
}
