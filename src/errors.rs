// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! Two error families are used across the crate. `AmqpError` covers the broker
//! plumbing: connecting, declaring the topology, subscribing and settling
//! deliveries. `MessagingError` covers the message level: encoding payloads,
//! publishing them and the outcome of a consumer handler.

use thiserror::Error;

/// Represents errors that can occur while talking to the broker or while
/// validating and installing the topology.
///
/// Every topology variant is treated as a configuration error: it is surfaced
/// at startup and never retried.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding a queue to an exchange
    #[error("failure to bind exchange `{0}` to queue `{1}`")]
    BindingExchangeToQueueError(String, String),

    /// The topology definition is inconsistent and was not installed
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos `{0}`")]
    QoSDeclarationError(String),

    /// Error creating a consumer on the given queue
    #[error("failure to declare consumer `{0}`")]
    BindingConsumerError(String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error negative-acknowledging a message
    #[error("failure to nack message")]
    NackMessageError,

    /// A consumer task stopped abnormally
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),
}

/// Errors raised while producing or handling a single message.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessagingError {
    /// The payload could not be serialized before publishing
    #[error("failure to serialize payload")]
    SerializePayloadError,

    /// The broker did not accept the publish
    #[error("failure to publish to exchange `{0}`")]
    PublisherError(String),

    /// A delivered payload could not be decoded
    #[error("failure to parse payload from queue `{0}`")]
    ParsePayloadError(String),

    /// A handler decided the message must not be processed
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Any other handler failure
    #[error("failure to handle message `{0}`")]
    ConsumerError(String),
}
