// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! This module provides functionality for defining, validating and installing
//! the RabbitMQ topology: exchanges, queues and the bindings between them.
//!
//! The main components are:
//! - `TopologyDefinition`: the immutable description of the topology, with a
//!   validator and an in-process routing model
//! - `Topology` trait: interface for installing a definition on a broker
//! - `AmqpTopology`: implementation of the Topology trait for RabbitMQ
//! - Header constants: queue argument names understood by RabbitMQ

use crate::{
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
    routing,
};
use async_trait::async_trait;
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable, LongString, ShortString},
    Channel,
};
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use tracing::{debug, error};

/// Queue argument naming the exchange rejected messages are republished to
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";
/// Queue argument naming the routing key used when dead-lettering
pub const AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY: &str = "x-dead-letter-routing-key";

/// Static description of exchanges, queues and bindings.
///
/// Built once at startup and passed by reference afterwards.
#[derive(Debug, Clone, Default)]
pub struct TopologyDefinition {
    pub(crate) exchanges: Vec<ExchangeDefinition>,
    pub(crate) queues: Vec<QueueDefinition>,
    pub(crate) queues_binding: Vec<QueueBinding>,
}

impl TopologyDefinition {
    pub fn new() -> TopologyDefinition {
        TopologyDefinition::default()
    }

    /// Adds an exchange definition.
    pub fn exchange(mut self, def: ExchangeDefinition) -> Self {
        self.exchanges.push(def);
        self
    }

    /// Adds a queue definition.
    pub fn queue(mut self, def: QueueDefinition) -> Self {
        self.queues.push(def);
        self
    }

    /// Adds a queue-to-exchange binding.
    pub fn queue_binding(mut self, binding: QueueBinding) -> Self {
        self.queues_binding.push(binding);
        self
    }

    pub fn exchanges(&self) -> &[ExchangeDefinition] {
        &self.exchanges
    }

    pub fn queues(&self) -> &[QueueDefinition] {
        &self.queues
    }

    pub fn bindings(&self) -> &[QueueBinding] {
        &self.queues_binding
    }

    pub fn find_exchange(&self, name: &str) -> Option<&ExchangeDefinition> {
        self.exchanges.iter().find(|e| e.name == name)
    }

    pub fn find_queue(&self, name: &str) -> Option<&QueueDefinition> {
        self.queues.iter().find(|q| q.name == name)
    }

    /// Queues that receive a message published to `exchange` with
    /// `routing_key`. A queue bound more than once still receives one copy.
    pub fn route(&self, exchange: &str, routing_key: &str) -> Vec<&str> {
        let Some(exch) = self.find_exchange(exchange) else {
            return vec![];
        };

        let mut targets: Vec<&str> = vec![];
        for binding in &self.queues_binding {
            if binding.exchange_name != exchange
                || !routing::binding_matches(exch.kind, &binding.routing_key, routing_key)
            {
                continue;
            }

            if !targets.contains(&binding.queue_name.as_str()) {
                targets.push(&binding.queue_name);
            }
        }

        targets
    }

    /// Queues a message lands in when it is rejected without requeue from
    /// `queue`. Empty when the queue has no dead-letter target.
    pub fn dead_letter_targets(&self, queue: &str) -> Vec<&str> {
        self.find_queue(queue)
            .and_then(|q| q.dead_letter.as_ref())
            .map(|dl| self.route(&dl.exchange, &dl.routing_key))
            .unwrap_or_default()
    }

    /// Checks that the definition is internally consistent.
    ///
    /// Names must be unique, bindings must reference declared objects, every
    /// dead-letter target must resolve to at least one bound queue and
    /// dead-lettering must never lead back to the queue it started from.
    pub fn validate(&self) -> Result<(), AmqpError> {
        let mut names = HashSet::new();
        for exch in &self.exchanges {
            if exch.name.is_empty() {
                return Err(invalid("exchange with an empty name".to_owned()));
            }
            if !names.insert(exch.name.as_str()) {
                return Err(invalid(format!("exchange `{}` declared twice", exch.name)));
            }
        }

        let mut names = HashSet::new();
        for queue in &self.queues {
            if queue.name.is_empty() {
                return Err(invalid("queue with an empty name".to_owned()));
            }
            if !names.insert(queue.name.as_str()) {
                return Err(invalid(format!("queue `{}` declared twice", queue.name)));
            }
        }

        for binding in &self.queues_binding {
            if self.find_exchange(&binding.exchange_name).is_none() {
                return Err(invalid(format!(
                    "binding of queue `{}` references undeclared exchange `{}`",
                    binding.queue_name, binding.exchange_name
                )));
            }
            if self.find_queue(&binding.queue_name).is_none() {
                return Err(invalid(format!(
                    "binding on exchange `{}` references undeclared queue `{}`",
                    binding.exchange_name, binding.queue_name
                )));
            }
        }

        for queue in &self.queues {
            let Some(dl) = &queue.dead_letter else {
                continue;
            };

            if self.find_exchange(&dl.exchange).is_none() {
                return Err(invalid(format!(
                    "queue `{}` dead-letters to undeclared exchange `{}`",
                    queue.name, dl.exchange
                )));
            }

            if self.dead_letter_targets(&queue.name).is_empty() {
                return Err(invalid(format!(
                    "dead-letter key `{}` on exchange `{}` reaches no queue for `{}`",
                    dl.routing_key, dl.exchange, queue.name
                )));
            }
        }

        self.check_dead_letter_cycles()
    }

    fn check_dead_letter_cycles(&self) -> Result<(), AmqpError> {
        for queue in &self.queues {
            let mut visited = HashSet::new();
            let mut pending = self.dead_letter_targets(&queue.name);

            while let Some(next) = pending.pop() {
                if next == queue.name {
                    return Err(invalid(format!(
                        "queue `{}` dead-letters back into itself",
                        queue.name
                    )));
                }
                if visited.insert(next) {
                    pending.extend(self.dead_letter_targets(next));
                }
            }
        }

        Ok(())
    }
}

fn invalid(reason: String) -> AmqpError {
    error!(reason = reason, "invalid topology");
    AmqpError::InvalidTopology(reason)
}

/// Builds the `queue.declare` arguments for a queue definition.
pub(crate) fn queue_arguments(def: &QueueDefinition) -> FieldTable {
    let mut args = BTreeMap::new();

    if let Some(dl) = &def.dead_letter {
        args.insert(
            ShortString::from(AMQP_HEADERS_DEAD_LETTER_EXCHANGE),
            AMQPValue::LongString(LongString::from(dl.exchange.clone())),
        );
        args.insert(
            ShortString::from(AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY),
            AMQPValue::LongString(LongString::from(dl.routing_key.clone())),
        );
    }

    FieldTable::from(args)
}

/// Trait defining the interface for installing a topology on a broker.
#[async_trait]
pub trait Topology {
    /// Validates `def` and declares it on the broker.
    ///
    /// Declarations are idempotent: re-declaring an identical object is a
    /// no-op, a conflicting one fails and is reported as a configuration
    /// error.
    async fn install(&self, def: &TopologyDefinition) -> Result<(), AmqpError>;
}

/// RabbitMQ implementation of the Topology trait.
pub struct AmqpTopology {
    channel: Arc<Channel>,
}

impl AmqpTopology {
    pub fn new(channel: Arc<Channel>) -> AmqpTopology {
        AmqpTopology { channel }
    }
}

#[async_trait]
impl Topology for AmqpTopology {
    /// Installs the topology in order: exchanges, queues, then bindings.
    async fn install(&self, def: &TopologyDefinition) -> Result<(), AmqpError> {
        def.validate()?;

        self.install_exchanges(def).await?;
        self.install_queues(def).await?;
        self.binding_queues(def).await
    }
}

impl AmqpTopology {
    async fn install_exchanges(&self, def: &TopologyDefinition) -> Result<(), AmqpError> {
        for exch in &def.exchanges {
            debug!("creating exchange: {}", exch.name);

            match self
                .channel
                .exchange_declare(
                    &exch.name,
                    exch.kind.into(),
                    ExchangeDeclareOptions {
                        passive: false,
                        durable: exch.durable,
                        auto_delete: false,
                        internal: false,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = exch.name,
                        "error to declare the exchange"
                    );
                    Err(AmqpError::DeclareExchangeError(exch.name.clone()))
                }
                _ => Ok(()),
            }?;

            debug!("exchange: {} was created", exch.name);
        }

        Ok(())
    }

    async fn install_queues(&self, def: &TopologyDefinition) -> Result<(), AmqpError> {
        for queue in &def.queues {
            debug!("creating queue: {}", queue.name);

            match self
                .channel
                .queue_declare(
                    &queue.name,
                    QueueDeclareOptions {
                        passive: false,
                        durable: queue.durable,
                        exclusive: false,
                        auto_delete: false,
                        nowait: false,
                    },
                    queue_arguments(queue),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = queue.name,
                        "error to declare the queue"
                    );
                    Err(AmqpError::DeclareQueueError(queue.name.clone()))
                }
                _ => {
                    debug!("queue: {} was created", queue.name);
                    Ok(())
                }
            }?;
        }

        Ok(())
    }

    async fn binding_queues(&self, def: &TopologyDefinition) -> Result<(), AmqpError> {
        for binding in &def.queues_binding {
            debug!(
                "binding queue: {} to the exchange: {} with the key: {}",
                binding.queue_name, binding.exchange_name, binding.routing_key
            );

            match self
                .channel
                .queue_bind(
                    &binding.queue_name,
                    &binding.exchange_name,
                    &binding.routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "error to bind queue to exchange");

                    Err(AmqpError::BindingExchangeToQueueError(
                        binding.exchange_name.clone(),
                        binding.queue_name.clone(),
                    ))
                }
                _ => Ok(()),
            }?;
        }

        debug!("queues were bound");

        Ok(())
    }
}
