// ESPHome web_server REST transport
use crate::application::fan_transport::FanTransport;
use crate::domain::actuator::ActuatorTarget;
use crate::domain::errors::ActuatorTransportError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

#[derive(Debug, Clone)]
pub struct EspHomeRestTransport {
    client: Client,
}

impl EspHomeRestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn entity_url(target: &ActuatorTarget) -> String {
        format!(
            "http://{}/fan/{}",
            target.ip_address.trim_end_matches('/'),
            urlencoding::encode(&target.entity_id)
        )
    }

    fn command_url(target: &ActuatorTarget, level: u8) -> String {
        if level == 0 {
            format!("{}/turn_off", Self::entity_url(target))
        } else {
            format!("{}/turn_on?speed_level={}", Self::entity_url(target), level)
        }
    }
}

async fn check_status(response: Response) -> Result<(), ActuatorTransportError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ActuatorTransportError::Rejected { status, body })
}

#[async_trait]
impl FanTransport for EspHomeRestTransport {
    async fn open(&self, target: &ActuatorTarget) -> Result<(), ActuatorTransportError> {
        let response = self.client.get(Self::entity_url(target)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ActuatorTransportError::EntityNotFound(target.entity_id.clone()));
        }
        check_status(response).await
    }

    async fn set_level(&self, target: &ActuatorTarget, level: u8) -> Result<(), ActuatorTransportError> {
        let url = Self::command_url(target, level);
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).send().await?;
        check_status(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ActuatorTarget {
        ActuatorTarget {
            ip_address: "192.168.99.100".to_string(),
            entity_id: "desk fan".to_string(),
            cooldown_ms: 300,
        }
    }

    #[test]
    fn test_command_urls() {
        assert_eq!(
            EspHomeRestTransport::command_url(&target(), 64),
            "http://192.168.99.100/fan/desk%20fan/turn_on?speed_level=64"
        );
        assert_eq!(
            EspHomeRestTransport::command_url(&target(), 0),
            "http://192.168.99.100/fan/desk%20fan/turn_off"
        );
    }
}
