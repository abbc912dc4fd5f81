/*!
 * # Fulfillment queue
 *
 * Hands committed orders to the downstream fulfillment worker over RabbitMQ.
 * Delivery is at-least-once: a failed publish drops the cached connection,
 * reconnects and retries exactly once, so the consumer must tolerate
 * duplicates.
 */

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entities::{order, order_item};
use crate::errors::ServiceError;

/// Message consumed by the fulfillment worker, one per committed order.
/// Field names are the worker's wire contract; amounts are JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessage {
    pub order_id: String,
    pub user_id: String,
    pub address_id: String,
    pub items: Vec<OrderMessageItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMessageItem {
    pub product_id: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl OrderMessage {
    pub fn from_order(header: &order::Model, items: &[order_item::Model]) -> Self {
        Self {
            order_id: header.id.to_string(),
            user_id: header.user_id.to_string(),
            address_id: header.address_id.to_string(),
            items: items
                .iter()
                .map(|item| OrderMessageItem {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                    price: item.unit_price,
                })
                .collect(),
            total: header.total,
            notes: header.notes.clone(),
        }
    }
}

/// Queue seam for order hand-off; `AmqpOrderQueue` in production, in-memory
/// elsewhere.
#[async_trait]
pub trait OrderQueue: Send + Sync {
    async fn publish_order(&self, message: &OrderMessage) -> Result<(), ServiceError>;
}

struct AmqpState {
    connection: Connection,
    channel: Channel,
}

/// RabbitMQ-backed queue with one lazily-established, cached connection and
/// channel. The durable queue is declared once per channel lifetime.
pub struct AmqpOrderQueue {
    url: String,
    queue: String,
    state: Mutex<Option<AmqpState>>,
}

impl AmqpOrderQueue {
    pub fn new(url: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue: queue.into(),
            state: Mutex::new(None),
        }
    }

    /// Returns a usable channel, reusing the cached one when its connection is
    /// still open and establishing a fresh connection otherwise.
    async fn ensure_channel(
        &self,
        state: &mut Option<AmqpState>,
    ) -> Result<Channel, ServiceError> {
        if let Some(cached) = state.as_ref() {
            if cached.connection.status().connected() && cached.channel.status().connected() {
                return Ok(cached.channel.clone());
            }
            warn!("cached AMQP connection is no longer open; reconnecting");
            *state = None;
        }

        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(|e| ServiceError::PublishError(format!("AMQP connect failed: {}", e)))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| ServiceError::PublishError(format!("AMQP channel failed: {}", e)))?;

        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                ServiceError::PublishError(format!("queue declare failed: {}", e))
            })?;

        info!(queue = %self.queue, "AMQP channel ready, durable queue declared");

        let handle = channel.clone();
        *state = Some(AmqpState {
            connection,
            channel,
        });
        Ok(handle)
    }

    async fn try_publish(&self, channel: &Channel, payload: &[u8]) -> Result<(), lapin::Error> {
        channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2), // persistent
            )
            .await?
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderQueue for AmqpOrderQueue {
    async fn publish_order(&self, message: &OrderMessage) -> Result<(), ServiceError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

        let mut state = self.state.lock().await;
        let channel = self.ensure_channel(&mut *state).await?;

        match self.try_publish(&channel, &payload).await {
            Ok(()) => {
                debug!(order_id = %message.order_id, queue = %self.queue, "order published");
                Ok(())
            }
            Err(first) => {
                // One transparent reconnect-and-retry; a second failure is the
                // caller's problem.
                warn!(
                    error = %first,
                    order_id = %message.order_id,
                    "publish failed, dropping cached connection and retrying once"
                );
                *state = None;
                let channel = self.ensure_channel(&mut *state).await?;
                self.try_publish(&channel, &payload).await.map_err(|e| {
                    ServiceError::PublishError(format!("publish retry failed: {}", e))
                })?;
                info!(order_id = %message.order_id, "order published after reconnect");
                Ok(())
            }
        }
    }
}

/// In-memory queue for tests and broker-less local development.
#[derive(Debug)]
pub struct InMemoryOrderQueue {
    messages: std::sync::Mutex<VecDeque<OrderMessage>>,
    max_size: usize,
}

impl InMemoryOrderQueue {
    pub fn new() -> Self {
        Self::with_max_size(1000)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            messages: std::sync::Mutex::new(VecDeque::new()),
            max_size,
        }
    }

    pub fn published(&self) -> Vec<OrderMessage> {
        self.messages.lock().unwrap().iter().cloned().collect()
    }

    pub fn pop(&self) -> Option<OrderMessage> {
        self.messages.lock().unwrap().pop_front()
    }
}

impl Default for InMemoryOrderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderQueue for InMemoryOrderQueue {
    async fn publish_order(&self, message: &OrderMessage) -> Result<(), ServiceError> {
        let mut messages = self.messages.lock().unwrap();
        if messages.len() >= self.max_size {
            return Err(ServiceError::PublishError("queue is full".to_string()));
        }
        messages.push_back(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_message() -> OrderMessage {
        OrderMessage {
            order_id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string(),
            user_id: Uuid::new_v4().to_string(),
            address_id: Uuid::new_v4().to_string(),
            items: vec![OrderMessageItem {
                product_id: Uuid::new_v4().to_string(),
                quantity: 2,
                price: dec!(12000),
            }],
            total: dec!(24000),
            notes: Some("no onions".to_string()),
        }
    }

    #[test]
    fn message_matches_worker_contract() {
        let json = serde_json::to_value(sample_message()).unwrap();

        assert_eq!(
            json["orderId"],
            serde_json::json!("7c9e6679-7425-40de-944b-e07fc1f90ae7")
        );
        assert!(json["userId"].is_string());
        assert!(json["addressId"].is_string());
        assert_eq!(json["items"][0]["quantity"], serde_json::json!(2));
        // Amounts go over the wire as numbers, not decimal strings.
        assert_eq!(json["items"][0]["price"], serde_json::json!(12000.0));
        assert_eq!(json["total"], serde_json::json!(24000.0));
        assert_eq!(json["notes"], serde_json::json!("no onions"));
    }

    #[tokio::test]
    async fn in_memory_queue_records_published_orders() {
        let queue = InMemoryOrderQueue::new();
        let message = sample_message();

        queue.publish_order(&message).await.unwrap();

        let published = queue.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], message);
        assert_eq!(queue.pop().unwrap().order_id, message.order_id);
        assert!(queue.pop().is_none());
    }

    #[tokio::test]
    async fn in_memory_queue_rejects_when_full() {
        let queue = InMemoryOrderQueue::with_max_size(1);
        queue.publish_order(&sample_message()).await.unwrap();

        let err = queue.publish_order(&sample_message()).await.unwrap_err();
        assert!(matches!(err, ServiceError::PublishError(_)));
    }
}
