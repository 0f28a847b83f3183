// Actuator client - cooldown-gated commands and the reconnection state machine
use crate::application::fan_transport::FanTransport;
use crate::application::live_state_store::LiveStateStore;
use crate::application::settings_store::SettingsStore;
use crate::domain::actuator::{ActuatorTarget, ConnectionState, DEFAULT_MAX_RECONNECT_ATTEMPTS};
use crate::domain::errors::ActuatorTransportError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct ActuatorOptions {
    pub max_reconnect_attempts: u32,
    /// Upper bound on any single call to the device.
    pub command_timeout: Duration,
}

impl Default for ActuatorOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            command_timeout: Duration::from_millis(1500),
        }
    }
}

/// What happened to a requested level. None of these are errors for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Same level as the last delivered one.
    Unchanged,
    /// Dropped because the cooldown since the last accepted send is still running.
    CoolingDown,
    /// Dropped because automatic reconnection has given up.
    Degraded,
    NotConnected,
    Failed,
}

pub struct ActuatorClient {
    transport: Arc<dyn FanTransport>,
    settings: SettingsStore,
    live: LiveStateStore,
    options: ActuatorOptions,
    state: ConnectionState,
    failed_attempts: u32,
    session: Option<ActuatorTarget>,
    last_accepted: Option<Instant>,
    last_delivered: Option<u8>,
}

impl ActuatorClient {
    pub fn new(
        transport: Arc<dyn FanTransport>,
        settings: SettingsStore,
        live: LiveStateStore,
        options: ActuatorOptions,
    ) -> Self {
        Self {
            transport,
            settings,
            live,
            options,
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            session: None,
            last_accepted: None,
            last_delivered: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Request `level`. Rate limited by the target's cooldown; intermediate
    /// levels are dropped, never queued.
    pub async fn send(&mut self, level: u8) -> SendOutcome {
        if self.state == ConnectionState::Degraded {
            return SendOutcome::Degraded;
        }

        let target = self.settings.current().target;
        if self.state == ConnectionState::Connected
            && self.session.as_ref().is_some_and(|s| !s.same_device(&target))
        {
            tracing::info!(
                "Actuator target changed to {}/{}, reconnecting",
                target.ip_address,
                target.entity_id
            );
            self.drop_session(ConnectionState::Disconnected, None);
        }

        if self.state == ConnectionState::Connected && self.last_delivered == Some(level) {
            return SendOutcome::Unchanged;
        }

        let now = Instant::now();
        let cooldown = Duration::from_millis(target.cooldown_ms);
        if self
            .last_accepted
            .is_some_and(|last| now.saturating_duration_since(last) < cooldown)
        {
            return SendOutcome::CoolingDown;
        }
        self.last_accepted = Some(now);

        if self.state != ConnectionState::Connected && !self.connect(&target).await {
            return match self.state {
                ConnectionState::Degraded => SendOutcome::Degraded,
                _ => SendOutcome::Failed,
            };
        }

        self.deliver(&target, level).await
    }

    /// Leave `Degraded` (or any other state) for `Connecting` with a fresh
    /// attempt budget.
    pub fn request_reconnect(&mut self) {
        tracing::info!("Manual reconnect requested");
        self.failed_attempts = 0;
        self.drop_session(ConnectionState::Connecting, None);
    }

    /// Make one connection attempt now unless the client is degraded or
    /// already connected.
    pub async fn connect_now(&mut self) -> ConnectionState {
        match self.state {
            ConnectionState::Degraded | ConnectionState::Connected => self.state,
            _ => {
                let target = self.settings.current().target;
                self.connect(&target).await;
                self.state
            }
        }
    }

    /// Send `level` immediately, bypassing cooldown and deduplication.
    pub async fn force_level(&mut self, level: u8) -> SendOutcome {
        if self.state != ConnectionState::Connected {
            return SendOutcome::NotConnected;
        }
        let target = self.settings.current().target;
        self.last_accepted = Some(Instant::now());
        self.deliver(&target, level).await
    }

    /// Turn the fan off if connected and close the session.
    pub async fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            let _ = self.force_level(0).await;
        }
        self.drop_session(ConnectionState::Disconnected, None);
    }

    async fn connect(&mut self, target: &ActuatorTarget) -> bool {
        self.transition(ConnectionState::Connecting, None);
        tracing::info!(
            "Connecting to fan {} at {} (attempt {}/{})",
            target.entity_id,
            target.ip_address,
            self.failed_attempts + 1,
            self.options.max_reconnect_attempts
        );

        match bounded(self.options.command_timeout, self.transport.open(target)).await {
            Ok(()) => {
                self.session = Some(target.clone());
                self.last_delivered = None;
                self.transition(ConnectionState::Connected, None);
                tracing::info!("Connected to fan {} at {}", target.entity_id, target.ip_address);
                true
            }
            Err(e) => {
                self.record_failure("Connection attempt", e);
                false
            }
        }
    }

    async fn deliver(&mut self, target: &ActuatorTarget, level: u8) -> SendOutcome {
        match bounded(self.options.command_timeout, self.transport.set_level(target, level)).await {
            Ok(()) => {
                self.last_delivered = Some(level);
                if self.failed_attempts > 0 {
                    self.failed_attempts = 0;
                    self.transition(ConnectionState::Connected, None);
                }
                tracing::info!("Fan speed: {}%", level);
                SendOutcome::Delivered
            }
            Err(e) => {
                self.record_failure("Fan command", e);
                match self.state {
                    ConnectionState::Degraded => SendOutcome::Degraded,
                    _ => SendOutcome::Failed,
                }
            }
        }
    }

    /// Failed opens and failed commands share one counter; only a delivered
    /// command resets it.
    fn record_failure(&mut self, what: &str, e: ActuatorTransportError) {
        self.failed_attempts += 1;
        self.drop_session(ConnectionState::Disconnected, Some(e.to_string()));
        if self.failed_attempts >= self.options.max_reconnect_attempts {
            tracing::error!(
                "Giving up on fan after {} failures, manual reconnect required: {}",
                self.failed_attempts,
                e
            );
            self.transition(ConnectionState::Degraded, None);
        } else {
            tracing::warn!("{} failed ({}): {}", what, self.failed_attempts, e);
        }
    }

    fn drop_session(&mut self, state: ConnectionState, error: Option<String>) {
        self.session = None;
        self.last_delivered = None;
        self.transition(state, error);
    }

    fn transition(&mut self, state: ConnectionState, error: Option<String>) {
        if self.state != state {
            tracing::debug!("Actuator {} -> {}", self.state, state);
        }
        self.state = state;
        self.live.record_connection(state, self.failed_attempts, error);
    }
}

async fn bounded<F>(limit: Duration, call: F) -> Result<(), ActuatorTransportError>
where
    F: Future<Output = Result<(), ActuatorTransportError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ActuatorTransportError::Timeout(limit.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fan_transport::testing::ScriptedTransport;
    use crate::application::settings_store::{RuntimeSettings, SettingsUpdate};
    use crate::domain::mapping::MappingConfig;

    fn setup(cooldown_ms: u64) -> (ActuatorClient, Arc<ScriptedTransport>, SettingsStore, LiveStateStore) {
        let transport = Arc::new(ScriptedTransport::default());
        let settings = SettingsStore::new(RuntimeSettings {
            mapping: MappingConfig::default(),
            target: ActuatorTarget {
                cooldown_ms,
                ..ActuatorTarget::default()
            },
            enabled: true,
        })
        .unwrap();
        let live = LiveStateStore::new(true);
        transport.observe(live.clone());
        let client = ActuatorClient::new(
            transport.clone(),
            settings.clone(),
            live.clone(),
            ActuatorOptions::default(),
        );
        (client, transport, settings, live)
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_within_cooldown_is_dropped() {
        let (mut client, transport, _, _) = setup(300);
        assert_eq!(client.connect_now().await, ConnectionState::Connected);

        assert_eq!(client.send(40).await, SendOutcome::Delivered);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(client.send(60).await, SendOutcome::CoolingDown);
        assert_eq!(transport.sent(), vec![40]);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(client.send(60).await, SendOutcome::Delivered);
        assert_eq!(transport.sent(), vec![40, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_calls_bounded_by_cooldown() {
        let (mut client, transport, _, _) = setup(300);
        client.connect_now().await;

        let start = Instant::now();
        for step in 0..40u8 {
            client.send(step).await;
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        let elapsed_ms = start.elapsed().as_millis() as usize;
        assert!(transport.sent().len() <= elapsed_ms / 300 + 1);
        assert!(transport.sent().len() >= elapsed_ms / 350);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_level_does_not_consume_cooldown() {
        let (mut client, transport, _, _) = setup(300);
        client.connect_now().await;

        assert_eq!(client.send(40).await, SendOutcome::Delivered);
        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(client.send(40).await, SendOutcome::Unchanged);
        assert_eq!(client.send(41).await, SendOutcome::Delivered);
        assert_eq!(transport.sent(), vec![40, 41]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reconnects_degrade_until_manual_reconnect() {
        let (mut client, transport, _, live) = setup(0);
        transport.fail_opens(3);

        for attempt in 1..=2 {
            assert_eq!(client.send(50).await, SendOutcome::Failed);
            assert_eq!(client.state(), ConnectionState::Disconnected);
            assert_eq!(client.failed_attempts(), attempt);
        }
        assert_eq!(client.send(50).await, SendOutcome::Degraded);
        assert_eq!(client.state(), ConnectionState::Degraded);
        assert_eq!(transport.states_seen_on_open(), vec![ConnectionState::Connecting; 3]);
        assert_eq!(
            live.connection_history(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Degraded,
            ]
        );

        let snapshot = live.snapshot();
        assert!(snapshot.manual_reconnect_required);
        assert_eq!(snapshot.failed_attempts, 3);
        assert!(snapshot.last_error.is_some());

        // no further automatic attempts
        assert_eq!(client.send(70).await, SendOutcome::Degraded);
        assert_eq!(client.connect_now().await, ConnectionState::Degraded);
        assert_eq!(transport.open_count(), 3);
        assert!(transport.sent().is_empty());

        client.request_reconnect();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.failed_attempts(), 0);
        assert!(!live.snapshot().manual_reconnect_required);

        assert_eq!(client.send(70).await, SendOutcome::Delivered);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(transport.sent(), vec![70]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_commands_degrade_even_when_open_succeeds() {
        let (mut client, transport, _, live) = setup(0);
        for _ in 0..10 {
            transport.fail_next_command();
        }

        for attempt in 1..=2 {
            assert_eq!(client.send(50).await, SendOutcome::Failed);
            assert_eq!(client.state(), ConnectionState::Disconnected);
            assert_eq!(client.failed_attempts(), attempt);
        }
        assert_eq!(client.send(50).await, SendOutcome::Degraded);
        assert_eq!(client.state(), ConnectionState::Degraded);
        assert!(live.snapshot().manual_reconnect_required);

        for _ in 0..7 {
            assert_eq!(client.send(50).await, SendOutcome::Degraded);
        }
        assert_eq!(transport.open_count(), 3);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_failure_disconnects_then_reconnects() {
        let (mut client, transport, _, live) = setup(0);
        client.connect_now().await;
        transport.fail_next_command();

        assert_eq!(client.send(30).await, SendOutcome::Failed);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.failed_attempts(), 1);
        assert!(live.snapshot().last_error.unwrap().contains("500"));

        assert_eq!(client.send(30).await, SendOutcome::Delivered);
        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.failed_attempts(), 0);
        let snapshot = live.snapshot();
        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(snapshot.failed_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_delivery_resets_attempts() {
        let (mut client, transport, _, _) = setup(0);
        transport.fail_opens(2);

        client.send(10).await;
        client.send(10).await;
        assert_eq!(client.failed_attempts(), 2);
        assert_eq!(client.send(10).await, SendOutcome::Delivered);
        assert_eq!(client.failed_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_change_reopens_session() {
        let (mut client, transport, settings, _) = setup(0);
        client.send(20).await;

        settings
            .update(SettingsUpdate {
                ip_address: Some("10.0.0.7".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(client.send(20).await, SendOutcome::Delivered);
        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.sent(), vec![20, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_level_bypasses_cooldown() {
        let (mut client, transport, _, live) = setup(1000);
        assert_eq!(client.force_level(0).await, SendOutcome::NotConnected);

        client.connect_now().await;
        client.send(80).await;
        assert_eq!(client.force_level(0).await, SendOutcome::Delivered);
        assert_eq!(transport.sent(), vec![80, 0]);
        // last_level is the computed level; forced commands leave it alone
        assert_eq!(live.snapshot().last_level, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_turns_fan_off() {
        let (mut client, transport, _, _) = setup(300);
        client.send(55).await;
        client.close().await;

        assert_eq!(transport.sent(), vec![55, 0]);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
