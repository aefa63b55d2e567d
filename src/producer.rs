// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Producer
//!
//! Selects the exchange and routing key for each publishing pattern and
//! serializes the payload. It keeps no state beyond the names it publishes to
//! and never retries: a failed publish is returned to the caller.

use crate::{
    config::TopologyConfigs,
    errors::MessagingError,
    message::{encode_text, Message, MESSAGE_TYPE, TEXT_TYPE},
    publisher::{PublishMessage, Publisher},
};
use opentelemetry::Context;
use std::sync::Arc;
use tracing::info;

pub struct Producer {
    publisher: Arc<dyn Publisher>,
    direct_exchange: String,
    direct_routing_key: String,
    topic_exchange: String,
    fanout_exchange: String,
}

impl Producer {
    pub fn new(publisher: Arc<dyn Publisher>, names: &TopologyConfigs) -> Producer {
        Producer {
            publisher,
            direct_exchange: names.direct_exchange.clone(),
            direct_routing_key: names.direct_routing_key.clone(),
            topic_exchange: names.topic_exchange.clone(),
            fanout_exchange: names.fanout_exchange.clone(),
        }
    }

    /// Publishes `message` as JSON to the direct exchange with the fixed
    /// routing key.
    pub async fn send_direct(&self, ctx: &Context, message: &Message) -> Result<(), MessagingError> {
        info!(body = message.message, "sending message to direct exchange");

        let infos = PublishMessage::new(&self.direct_exchange, message.encode()?)
            .key(&self.direct_routing_key)
            .msg_type(MESSAGE_TYPE);
        self.publisher.publish(ctx, &infos).await?;

        info!(exchange = self.direct_exchange, "direct message sent");
        Ok(())
    }

    /// Publishes `body` to the topic exchange with the caller's routing key.
    /// The key is passed through untouched.
    pub async fn send_topic(
        &self,
        ctx: &Context,
        routing_key: &str,
        body: &str,
    ) -> Result<(), MessagingError> {
        info!(routing_key, body, "sending message to topic exchange");

        let infos = PublishMessage::new(&self.topic_exchange, encode_text(body)?)
            .key(routing_key)
            .msg_type(TEXT_TYPE);
        self.publisher.publish(ctx, &infos).await?;

        info!(exchange = self.topic_exchange, routing_key, "topic message sent");
        Ok(())
    }

    /// Publishes `body` to the fanout exchange with an empty routing key.
    pub async fn send_fanout(&self, ctx: &Context, body: &str) -> Result<(), MessagingError> {
        info!(body, "sending message to fanout exchange");

        let infos = PublishMessage::new(&self.fanout_exchange, encode_text(body)?)
            .key("")
            .msg_type(TEXT_TYPE);
        self.publisher.publish(ctx, &infos).await?;

        info!(exchange = self.fanout_exchange, "fanout message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::MockPublisher;
    use mockall::predicate::always;

    fn producer_expecting(expected: PublishMessage) -> Producer {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(move |_, infos| *infos == expected)
            .times(1)
            .returning(|_, _| Ok(()));

        Producer::new(Arc::new(publisher), &TopologyConfigs::default())
    }

    #[tokio::test]
    async fn test_send_direct_uses_fixed_key() {
        let names = TopologyConfigs::default();
        let producer = producer_expecting(
            PublishMessage::new(&names.direct_exchange, br#"{"message":"hello"}"#.to_vec())
                .key(&names.direct_routing_key)
                .msg_type(MESSAGE_TYPE),
        );

        let result = producer
            .send_direct(&Context::new(), &Message::new("hello"))
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_send_topic_passes_the_key_through() {
        let names = TopologyConfigs::default();
        let producer = producer_expecting(
            PublishMessage::new(&names.topic_exchange, br#""disk full""#.to_vec())
                .key("log.error")
                .msg_type(TEXT_TYPE),
        );

        let result = producer
            .send_topic(&Context::new(), "log.error", "disk full")
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_send_fanout_uses_empty_key() {
        let names = TopologyConfigs::default();
        let producer = producer_expecting(
            PublishMessage::new(&names.fanout_exchange, br#""promo""#.to_vec())
                .key("")
                .msg_type(TEXT_TYPE),
        );

        assert_eq!(producer.send_fanout(&Context::new(), "promo").await, Ok(()));
    }

    #[tokio::test]
    async fn test_publish_failure_is_not_retried() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .with(always(), always())
            .times(1)
            .returning(|_, infos| Err(MessagingError::PublisherError(infos.to.clone())));

        let producer = Producer::new(Arc::new(publisher), &TopologyConfigs::default());
        let result = producer.send_fanout(&Context::new(), "promo").await;

        assert_eq!(
            result,
            Err(MessagingError::PublisherError("fanout-exchange".to_owned()))
        );
    }
}
