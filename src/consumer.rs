// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Consumer
//!
//! Processes a single delivery: opens a consumer span, runs the queue's
//! handler and settles the delivery.
//!
//! Settlement policy: a successful handler acknowledges the delivery, any
//! handler error (including an undecodable payload) rejects it without
//! requeue. The broker then dead-letters it when the queue has a dead-letter
//! target and drops it otherwise. Nothing is ever requeued, so a message can
//! not loop between a queue and its consumer.

use crate::{
    dispatcher::QueueConsumer,
    errors::{AmqpError, MessagingError},
    handler::ConsumerMessage,
    otel,
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
    protocol::basic::AMQPProperties,
};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status},
};
use std::borrow::Cow;
use tracing::{debug, error, warn};

/// Header RabbitMQ adds to every dead-lettered message
pub const AMQP_HEADERS_X_DEATH: &str = "x-death";
/// Field of an `x-death` entry counting how often that path was taken
pub const AMQP_HEADERS_COUNT: &str = "count";

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    /// `basic.nack` with `requeue = false`
    Reject,
}

impl Settlement {
    pub fn from_result(result: &Result<(), MessagingError>) -> Settlement {
        match result {
            Ok(()) => Settlement::Ack,
            Err(_) => Settlement::Reject,
        }
    }
}

/// Settles deliveries with the broker.
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait DeliverySettler: Send + Sync {
    /// Acknowledges the delivery.
    async fn ack(&self) -> Result<(), AmqpError>;
    /// Negatively acknowledges the delivery with `requeue = false`.
    async fn reject(&self) -> Result<(), AmqpError>;
}

#[async_trait]
impl DeliverySettler for Acker {
    async fn ack(&self) -> Result<(), AmqpError> {
        Acker::ack(self, BasicAckOptions { multiple: false })
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "error whiling ack msg");
                AmqpError::AckMessageError
            })
    }

    async fn reject(&self) -> Result<(), AmqpError> {
        self.nack(BasicNackOptions {
            multiple: false,
            requeue: false,
        })
        .await
        .map_err(|err| {
            error!(error = err.to_string(), "error whiling nack msg");
            AmqpError::NackMessageError
        })
    }
}

/// Runs the handler of `def` on `delivery` and settles it.
pub(crate) async fn consume(
    tracer: &BoxedTracer,
    delivery: &Delivery,
    def: &QueueConsumer,
) -> Result<(), AmqpError> {
    debug!(
        queue = def.queue,
        exchange = delivery.exchange.to_string(),
        routing_key = delivery.routing_key.to_string(),
        redelivered = delivery.redelivered,
        "received delivery"
    );

    process(tracer, &delivery.properties, &delivery.data, &delivery.acker, def)
        .await
        .map(|_| ())
}

/// Runs the handler of `def` on a delivery body and settles the delivery
/// through `settler`.
///
/// # Parameters
/// * `tracer` - Tracer of the consumer span
/// * `props` - Delivery properties, carrying the trace context and `x-death`
/// * `data` - Delivery body
/// * `settler` - Acknowledges or rejects the delivery
/// * `def` - Queue and handler
///
/// # Returns
/// How the delivery was settled, or the settlement failure.
pub(crate) async fn process(
    tracer: &BoxedTracer,
    props: &AMQPProperties,
    data: &[u8],
    settler: &dyn DeliverySettler,
    def: &QueueConsumer,
) -> Result<Settlement, AmqpError> {
    let (msg_type, count) = extract_header_properties(props);

    let (ctx, mut span) = otel::new_span(props, tracer, &def.queue);

    let msg = ConsumerMessage::new(&def.queue, &msg_type, data, count);
    let result = def.handler.exec(&ctx, &msg).await;
    let settlement = Settlement::from_result(&result);

    match settlement {
        Settlement::Ack => match settler.ack().await {
            Err(e) => {
                span.record_error(&e);
                span.set_status(Status::Error {
                    description: Cow::from("error to ack msg"),
                });
                Err(e)
            }
            _ => {
                debug!(queue = def.queue, "message successfully processed");
                span.set_status(Status::Ok);
                Ok(settlement)
            }
        },
        Settlement::Reject => {
            if let Err(err) = &result {
                warn!(
                    error = err.to_string(),
                    queue = def.queue,
                    "handler failed, rejecting without requeue"
                );
                span.record_error(err);
                span.set_status(Status::Error {
                    description: Cow::from(err.to_string()),
                });
            }

            match settler.reject().await {
                Err(e) => {
                    span.record_error(&e);
                    Err(e)
                }
                _ => Ok(settlement),
            }
        }
    }
}

/// Extracts the message type and the dead-letter count from the delivery
/// properties. Missing or malformed values read as empty and zero.
pub(crate) fn extract_header_properties(props: &AMQPProperties) -> (String, i64) {
    let count = props
        .headers()
        .as_ref()
        .and_then(|headers| headers.inner().get(AMQP_HEADERS_X_DEATH))
        .and_then(|value| value.as_array())
        .and_then(|deaths| deaths.as_slice().first())
        .and_then(|death| death.as_field_table())
        .and_then(|death| death.inner().get(AMQP_HEADERS_COUNT))
        .and_then(|value| value.as_long_long_int())
        .unwrap_or_default();

    let msg_type = match props.kind() {
        Some(value) => value.to_string(),
        _ => "".to_owned(),
    };

    (msg_type, count)
}
