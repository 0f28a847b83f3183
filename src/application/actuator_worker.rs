// Drains the latest-level slot into the actuator client
use crate::application::actuator_client::ActuatorClient;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Forward each new level to `client` until shutdown, then turn the fan off
/// and close the session. Levels published while a send is in flight
/// overwrite each other in the slot; only the newest is sent.
pub async fn run_actuator_worker(
    client: Arc<Mutex<ActuatorClient>>,
    mut level_rx: watch::Receiver<Option<u8>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            changed = level_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let level = *level_rx.borrow_and_update();
                if let Some(level) = level {
                    let mut client = client.lock().await;
                    let outcome = client.send(level).await;
                    tracing::trace!("Level {} -> {:?} ({})", level, outcome, client.state());
                }
            }
        }
    }

    tracing::info!("Stopping fan");
    client.lock().await.close().await;
}
