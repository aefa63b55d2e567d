// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Payloads
//!
//! Two payload shapes travel through the exchanges. The direct exchange
//! carries a [`Message`] encoded as a JSON object; topic and fanout carry a
//! plain text encoded as a JSON string literal.

use crate::errors::MessagingError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// AMQP `type` property of a JSON encoded [`Message`]
pub const MESSAGE_TYPE: &str = "message";
/// AMQP `type` property of a text payload
pub const TEXT_TYPE: &str = "text";

/// Payload of the direct exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self).map_err(|err| {
            error!(error = err.to_string(), "failure to serialize message");
            MessagingError::SerializePayloadError
        })
    }

    /// Decodes a delivery body. `queue` is only used for the error.
    pub fn decode(data: &[u8], queue: &str) -> Result<Message, MessagingError> {
        serde_json::from_slice(data).map_err(|err| {
            error!(error = err.to_string(), queue, "failure to parse message");
            MessagingError::ParsePayloadError(queue.to_owned())
        })
    }
}

/// Encodes a text payload as a JSON string literal.
pub fn encode_text(body: &str) -> Result<Vec<u8>, MessagingError> {
    serde_json::to_vec(body).map_err(|err| {
        error!(error = err.to_string(), "failure to serialize text");
        MessagingError::SerializePayloadError
    })
}

/// Decodes a text payload.
///
/// Bodies that are not a JSON string literal (for instance published by
/// another client without the JSON envelope) are taken verbatim.
pub fn decode_text(data: &[u8], queue: &str) -> Result<String, MessagingError> {
    if let Ok(text) = serde_json::from_slice::<String>(data) {
        return Ok(text);
    }

    String::from_utf8(data.to_vec()).map_err(|err| {
        error!(error = err.to_string(), queue, "payload is not utf-8");
        MessagingError::ParsePayloadError(queue.to_owned())
    })
}
