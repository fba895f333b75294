use crate::shared::infrastructure::event_bus::{EventPublisher, PublishError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes through the Pulsar REST producer endpoint. The routing key is the topic name.
#[derive(Debug, Clone)]
pub struct PulsarEventBus {
    client: Client,
    producer_name: String,
    broker_url: String,
    tenant: String,
    namespace: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PulsarProducerMessageProperties {
    event_type: String,
    timestamp: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PulsarProducerMessage {
    payload: String,
    key: Option<String>,
    properties: Option<PulsarProducerMessageProperties>,
    context: Option<String>,
    replication_clusters: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PulsarProducerBody<'a> {
    producer_name: &'a str,
    messages: Vec<PulsarProducerMessage>,
}

impl PulsarEventBus {
    pub fn new(
        producer_name: impl Into<String>,
        broker_url: impl Into<String>,
        tenant: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(PUBLISH_TIMEOUT).build()?,
            producer_name: producer_name.into(),
            broker_url: broker_url.into().trim_end_matches('/').to_string(),
            tenant: tenant.into(),
            namespace: namespace.into(),
        })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!(
            "{}/topics/persistent/{}/{}/{}",
            self.broker_url, self.tenant, self.namespace, topic
        )
    }
}

#[async_trait]
impl EventPublisher for PulsarEventBus {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let payload = std::str::from_utf8(payload)
            .map_err(|err| PublishError::PublishEventFailed(err.to_string()))?;
        let body = PulsarProducerBody {
            producer_name: &self.producer_name,
            messages: vec![PulsarProducerMessage {
                payload: payload.to_string(),
                key: None,
                properties: Some(PulsarProducerMessageProperties {
                    event_type: routing_key.to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                }),
                context: None,
                replication_clusters: None,
            }],
        };

        self.client
            .post(self.topic_url(routing_key))
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| PublishError::PublishEventFailed(err.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod pulsar_event_bus_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_build_the_persistent_topic_url() {
        let bus =
            PulsarEventBus::new("payments", "http://localhost:8080/", "public", "default").unwrap();
        assert_eq!(
            bus.topic_url("PaymentCompletedIntegrationEvent"),
            "http://localhost:8080/topics/persistent/public/default/PaymentCompletedIntegrationEvent"
        );
    }

    #[rstest]
    #[tokio::test]
    #[ignore]
    async fn integration_pulsar_should_publish_the_event() {
        let bus =
            PulsarEventBus::new("payments", "http://localhost:8080", "public", "default").unwrap();
        let result = bus
            .publish("PaymentCompletedIntegrationEvent", br#"{"status":"Completed"}"#)
            .await;
        assert!(result.is_ok());
    }
}
