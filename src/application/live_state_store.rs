// Single shared LiveState, written by the pipeline and read by observers
use crate::domain::actuator::ConnectionState;
use crate::domain::live_state::LiveState;
use crate::domain::telemetry::TelemetrySample;
use std::sync::Arc;
use tokio::sync::watch;

/// Writers mutate in place under the channel lock, readers always get a
/// whole snapshot.
#[derive(Clone)]
pub struct LiveStateStore {
    tx: Arc<watch::Sender<LiveState>>,
    #[cfg(test)]
    history: Arc<std::sync::Mutex<Vec<ConnectionState>>>,
}

impl LiveStateStore {
    pub fn new(enabled: bool) -> Self {
        let (tx, _rx) = watch::channel(LiveState {
            enabled,
            ..LiveState::default()
        });
        Self {
            tx: Arc::new(tx),
            #[cfg(test)]
            history: Arc::default(),
        }
    }

    pub fn snapshot(&self) -> LiveState {
        self.tx.borrow().clone()
    }

    pub fn record_cycle(&self, sample: TelemetrySample, level: u8, compensation: f64, enabled: bool) {
        self.tx.send_modify(|state| {
            state.last_sample = Some(sample);
            state.last_level = Some(level);
            state.compensation = compensation;
            state.enabled = enabled;
        });
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.tx.send_modify(|state| state.enabled = enabled);
    }

    pub fn record_connection(
        &self,
        connection: ConnectionState,
        failed_attempts: u32,
        last_error: Option<String>,
    ) {
        #[cfg(test)]
        if let Ok(mut history) = self.history.lock() {
            history.push(connection);
        }
        self.tx.send_modify(|state| {
            state.connection = connection;
            state.failed_attempts = failed_attempts;
            if last_error.is_some() {
                state.last_error = last_error;
            } else if connection == ConnectionState::Connected {
                state.last_error = None;
            }
            state.manual_reconnect_required = connection == ConnectionState::Degraded;
        });
    }
}

#[cfg(test)]
impl LiveStateStore {
    /// Every connection state published so far, in order.
    pub fn connection_history(&self) -> Vec<ConnectionState> {
        self.history.lock().unwrap().clone()
    }
}
