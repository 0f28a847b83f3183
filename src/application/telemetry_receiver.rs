// UDP receive loop feeding the control loop and the latest-level slot
use crate::application::control_loop::ControlLoop;
use crate::domain::errors::SocketBindError;
use crate::domain::telemetry::{OUTGAUGE_PACKET_LEN, decode_outgauge};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::Instant;

/// Pause after a socket error before the next receive.
const SOCKET_ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub struct TelemetryReceiver {
    socket: UdpSocket,
    control: ControlLoop,
    level_tx: watch::Sender<Option<u8>>,
}

impl TelemetryReceiver {
    pub async fn bind(
        addr: SocketAddr,
        control: ControlLoop,
        level_tx: watch::Sender<Option<u8>>,
    ) -> Result<Self, SocketBindError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| SocketBindError { addr, source })?;
        Ok(Self {
            socket,
            control,
            level_tx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive until `shutdown` flips to true. Bad packets and socket errors
    /// are logged and skipped. The socket is closed when this returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        // one spare byte so oversized datagrams are detected instead of truncated to size
        let mut buf = vec![0u8; OUTGAUGE_PACKET_LEN + 1];
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, peer)) => self.handle_datagram(&buf[..len], peer),
                        Err(e) => {
                            tracing::warn!("Telemetry socket error: {}", e);
                            if !back_off(&mut shutdown).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("Telemetry receiver stopped");
    }

    fn handle_datagram(&mut self, packet: &[u8], peer: SocketAddr) {
        let sample = match decode_outgauge(packet, Utc::now()) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::debug!("Discarding packet from {}: {}", peer, e);
                return;
            }
        };

        let level = self.control.process(sample, Instant::now());
        self.level_tx.send_replace(Some(level));
    }
}

/// Sleep out the error backoff. Returns false if shutdown was requested
/// in the meantime.
async fn back_off(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(SOCKET_ERROR_BACKOFF) => true,
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::live_state_store::LiveStateStore;
    use crate::application::settings_store::{RuntimeSettings, SettingsStore};
    use crate::domain::actuator::ActuatorTarget;
    use crate::domain::mapping::MappingConfig;
    use crate::domain::telemetry::encode_outgauge;
    use std::time::Duration;

    fn control() -> (ControlLoop, LiveStateStore) {
        let settings = SettingsStore::new(RuntimeSettings {
            mapping: MappingConfig::default(),
            target: ActuatorTarget::default(),
            enabled: true,
        })
        .unwrap();
        let live = LiveStateStore::new(true);
        (ControlLoop::new(settings, live.clone()), live)
    }

    #[tokio::test]
    async fn test_packets_drive_latest_level() {
        let (control, live) = control();
        let (level_tx, mut level_rx) = watch::channel(None);
        let receiver = TelemetryReceiver::bind("127.0.0.1:0".parse().unwrap(), control, level_tx)
            .await
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(receiver.run(shutdown_rx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // garbage first: must be skipped without stopping the loop
        sender.send_to(&[1, 2, 3], addr).await.unwrap();
        sender
            .send_to(&encode_outgauge(150.0 / 3.6, "ETK", 3, 4000.0), addr)
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), level_rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*level_rx.borrow_and_update(), Some(50));
        assert_eq!(live.snapshot().last_sample.unwrap().car, "ETK");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_error_backoff_waits_before_retry() {
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let start = Instant::now();
        assert!(back_off(&mut shutdown_rx).await);
        assert!(start.elapsed() >= SOCKET_ERROR_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cuts_backoff_short() {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let start = Instant::now();
        let backoff = tokio::spawn(async move { back_off(&mut shutdown_rx).await });
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();

        assert!(!backoff.await.unwrap());
        assert!(start.elapsed() < SOCKET_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let (control, _) = control();
        let (level_tx, _level_rx) = watch::channel(None);
        let err = TelemetryReceiver::bind(addr, control, level_tx)
            .await
            .err()
            .unwrap();
        assert_eq!(err.addr, addr);
    }
}
