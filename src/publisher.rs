// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! This module provides the `Publisher` abstraction and its RabbitMQ
//! implementation. Publishing is fire-and-forget: a publish succeeds once the
//! broker accepted the frame, consumer delivery is not awaited.

use crate::{errors::MessagingError, otel};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use lapin::{
    options::BasicPublishOptions,
    types::{AMQPValue, FieldTable, ShortString},
    BasicProperties, Channel,
};
use opentelemetry::Context;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error};
use uuid::Uuid;

/// Default content type for JSON messages
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Delivery mode asking the broker to persist the message in durable queues
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMessage {
    /// Exchange name
    pub to: String,
    /// Routing key, empty when absent
    pub key: Option<String>,
    /// Value of the AMQP `type` property
    pub msg_type: Option<String>,
    pub data: Vec<u8>,
}

impl PublishMessage {
    pub fn new(to: &str, data: Vec<u8>) -> Self {
        PublishMessage {
            to: to.to_owned(),
            key: None,
            msg_type: None,
            data,
        }
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }

    pub fn msg_type(mut self, msg_type: &str) -> Self {
        self.msg_type = Some(msg_type.to_owned());
        self
    }
}

/// Something that can hand a message to the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError>;
}

/// RabbitMQ implementation of the Publisher trait.
pub struct RabbitMQPublisher {
    channel: Arc<Channel>,
}

impl RabbitMQPublisher {
    pub fn new(channel: Arc<Channel>) -> Arc<RabbitMQPublisher> {
        Arc::new(RabbitMQPublisher { channel })
    }
}

#[async_trait]
impl Publisher for RabbitMQPublisher {
    /// Publishes a message with a fresh message id, the JSON content type and
    /// the trace context of `ctx` in its headers.
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError> {
        let mut headers = BTreeMap::<ShortString, AMQPValue>::default();
        otel::inject_context(ctx, &mut headers);

        let message_id = Uuid::new_v4().to_string();

        match self
            .channel
            .basic_publish(
                &infos.to,
                infos.key.as_deref().unwrap_or_default(),
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &infos.data,
                BasicProperties::default()
                    .with_content_type(ShortString::from(JSON_CONTENT_TYPE))
                    .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
                    .with_kind(ShortString::from(
                        infos.msg_type.clone().unwrap_or_default(),
                    ))
                    .with_message_id(ShortString::from(message_id.clone()))
                    .with_headers(FieldTable::from(headers)),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    exchange = infos.to,
                    "error publishing message"
                );
                Err(MessagingError::PublisherError(infos.to.clone()))
            }
            _ => {
                debug!(
                    exchange = infos.to,
                    message_id = message_id,
                    body_length = infos.data.len(),
                    "message published"
                );
                Ok(())
            }
        }
    }
}
