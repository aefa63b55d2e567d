// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consumer Handlers
//!
//! The seam between the dispatcher and the per-queue processing logic. A
//! handler returning `Ok` gets its delivery acknowledged; any error rejects
//! the delivery without requeue.

use crate::{
    errors::MessagingError,
    message::{decode_text, Message, MESSAGE_TYPE},
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use opentelemetry::Context;

/// A delivery as seen by a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerMessage {
    /// Queue the delivery came from
    pub queue: String,
    /// AMQP `type` property, empty when the publisher did not set one
    pub msg_type: String,
    pub data: Vec<u8>,
    /// How many times the message was dead-lettered before, from `x-death`
    pub death_count: i64,
}

impl ConsumerMessage {
    pub fn new(queue: &str, msg_type: &str, data: &[u8], death_count: i64) -> Self {
        ConsumerMessage {
            queue: queue.to_owned(),
            msg_type: msg_type.to_owned(),
            data: data.to_vec(),
            death_count,
        }
    }

    /// Decodes the human readable body of the delivery, choosing the payload
    /// shape from the `type` property.
    ///
    /// # Returns
    /// The `message` field of a [`Message`] typed delivery, the text of any
    /// other delivery, or a parse error naming the queue.
    pub fn body(&self) -> Result<String, MessagingError> {
        if self.msg_type == MESSAGE_TYPE {
            return Message::decode(&self.data, &self.queue).map(|message| message.message);
        }

        decode_text(&self.data, &self.queue)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn exec(&self, ctx: &Context, msg: &ConsumerMessage) -> Result<(), MessagingError>;
}
