// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Listeners
//!
//! One handler per queue of the service topology. Apart from the direct queue
//! handler, which runs a [`MessageValidator`], they only log what they
//! receive.

use crate::{
    config::TopologyConfigs,
    dispatcher::QueueConsumer,
    errors::MessagingError,
    handler::{ConsumerHandler, ConsumerMessage},
    message::Message,
};
use async_trait::async_trait;
use opentelemetry::Context;
use std::{fmt, sync::Arc};
use tracing::{info, warn};

/// Decides whether a direct-exchange message may be processed.
pub trait MessageValidator: Send + Sync {
    /// Returns the rejection reason when the message must be dead-lettered.
    fn validate(&self, message: &Message) -> Result<(), String>;
}

/// Rejects every message whose body contains a keyword.
#[derive(Debug, Clone)]
pub struct KeywordValidator {
    keyword: String,
}

impl KeywordValidator {
    pub fn new(keyword: &str) -> Self {
        KeywordValidator {
            keyword: keyword.to_owned(),
        }
    }
}

impl MessageValidator for KeywordValidator {
    fn validate(&self, message: &Message) -> Result<(), String> {
        if !self.keyword.is_empty() && message.message.contains(&self.keyword) {
            return Err(format!("simulated failure: body contains `{}`", self.keyword));
        }

        Ok(())
    }
}

/// Handler of the queue bound to the direct exchange.
pub struct DirectQueueHandler {
    validator: Arc<dyn MessageValidator>,
}

impl DirectQueueHandler {
    pub fn new(validator: Arc<dyn MessageValidator>) -> Self {
        DirectQueueHandler { validator }
    }
}

#[async_trait]
impl ConsumerHandler for DirectQueueHandler {
    async fn exec(&self, _ctx: &Context, msg: &ConsumerMessage) -> Result<(), MessagingError> {
        let message = Message::decode(&msg.data, &msg.queue)?;
        info!(queue = msg.queue, body = message.message, "message received");

        if let Err(reason) = self.validator.validate(&message) {
            warn!(
                queue = msg.queue,
                body = message.message,
                reason,
                "rejecting message, it will be dead-lettered"
            );
            return Err(MessagingError::Rejected(reason));
        }

        Ok(())
    }
}

/// Handler of the dead-letter queue.
///
/// Never rejects: the dead-letter queue has no dead-letter target of its own,
/// so a rejection would drop the message.
pub struct DeadLetterHandler;

#[async_trait]
impl ConsumerHandler for DeadLetterHandler {
    async fn exec(&self, _ctx: &Context, msg: &ConsumerMessage) -> Result<(), MessagingError> {
        let body = msg
            .body()
            .unwrap_or_else(|_| String::from_utf8_lossy(&msg.data).into_owned());

        warn!(
            queue = msg.queue,
            body,
            deaths = msg.death_count,
            "dead-lettered message received"
        );
        Ok(())
    }
}

/// Which topic binding a [`LogHandler`] serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Error,
    All,
}

/// Handler of the queues bound to the topic exchange.
pub struct LogHandler {
    stream: LogStream,
}

impl LogHandler {
    pub fn new(stream: LogStream) -> Self {
        LogHandler { stream }
    }
}

#[async_trait]
impl ConsumerHandler for LogHandler {
    async fn exec(&self, _ctx: &Context, msg: &ConsumerMessage) -> Result<(), MessagingError> {
        let body = msg.body()?;

        match self.stream {
            LogStream::Error => info!(queue = msg.queue, body, "error log received"),
            LogStream::All => info!(queue = msg.queue, body, "log received"),
        }
        Ok(())
    }
}

/// Delivery channel served by a [`NotificationHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationChannel {
    Sms,
    Email,
    Push,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Sms => write!(f, "sms"),
            NotificationChannel::Email => write!(f, "email"),
            NotificationChannel::Push => write!(f, "push"),
        }
    }
}

/// Handler of the queues bound to the fanout exchange.
pub struct NotificationHandler {
    channel: NotificationChannel,
}

impl NotificationHandler {
    pub fn new(channel: NotificationChannel) -> Self {
        NotificationHandler { channel }
    }
}

#[async_trait]
impl ConsumerHandler for NotificationHandler {
    async fn exec(&self, _ctx: &Context, msg: &ConsumerMessage) -> Result<(), MessagingError> {
        let body = msg.body()?;
        info!(
            queue = msg.queue,
            channel = %self.channel,
            body,
            "notification sent"
        );
        Ok(())
    }
}

/// One consumer per queue of the service topology.
pub fn standard_listeners(names: &TopologyConfigs) -> Vec<QueueConsumer> {
    let validator = Arc::new(KeywordValidator::new(&names.fail_keyword));

    vec![
        QueueConsumer::new(
            &names.direct_queue,
            Arc::new(DirectQueueHandler::new(validator)),
        ),
        QueueConsumer::new(&names.dead_letter_queue, Arc::new(DeadLetterHandler)),
        QueueConsumer::new(
            &names.error_logs_queue,
            Arc::new(LogHandler::new(LogStream::Error)),
        ),
        QueueConsumer::new(
            &names.all_logs_queue,
            Arc::new(LogHandler::new(LogStream::All)),
        ),
        QueueConsumer::new(
            &names.sms_queue,
            Arc::new(NotificationHandler::new(NotificationChannel::Sms)),
        ),
        QueueConsumer::new(
            &names.email_queue,
            Arc::new(NotificationHandler::new(NotificationChannel::Email)),
        ),
        QueueConsumer::new(
            &names.push_queue,
            Arc::new(NotificationHandler::new(NotificationChannel::Push)),
        ),
    ]
}
