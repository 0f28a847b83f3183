// Home Assistant REST transport (fan domain services)
use crate::application::fan_transport::FanTransport;
use crate::domain::actuator::ActuatorTarget;
use crate::domain::errors::ActuatorTransportError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct HomeAssistantTransport {
    client: Client,
    token: String,
}

#[derive(Debug, Serialize)]
struct FanServiceCall<'a> {
    entity_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<u8>,
}

impl HomeAssistantTransport {
    pub fn new(client: Client, token: String) -> Self {
        Self { client, token }
    }

    fn base_url(target: &ActuatorTarget) -> String {
        let host = target.ip_address.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    fn fan_entity(target: &ActuatorTarget) -> String {
        if target.entity_id.starts_with("fan.") {
            target.entity_id.clone()
        } else {
            format!("fan.{}", target.entity_id)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl FanTransport for HomeAssistantTransport {
    async fn open(&self, target: &ActuatorTarget) -> Result<(), ActuatorTransportError> {
        let entity = Self::fan_entity(target);
        let url = format!("{}/api/states/{}", Self::base_url(target), entity);
        let response = self.authorized(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ActuatorTransportError::EntityNotFound(entity)),
            status if status.is_success() => Ok(()),
            status => Err(ActuatorTransportError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn set_level(&self, target: &ActuatorTarget, level: u8) -> Result<(), ActuatorTransportError> {
        let entity = Self::fan_entity(target);
        let (service, percentage) = match level {
            0 => ("turn_off", None),
            _ => ("turn_on", Some(level)),
        };
        let url = format!("{}/api/services/fan/{}", Self::base_url(target), service);
        let body = FanServiceCall {
            entity_id: &entity,
            percentage,
        };

        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ActuatorTransportError::Rejected { status, body });
        }
        Ok(())
    }
}
