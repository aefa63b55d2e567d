// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Definitions
//!
//! Types for declaring queues and binding them to exchanges. A queue may name
//! a dead-letter exchange and routing key; the broker republishes every
//! message rejected without requeue from that queue there.

/// Dead-letter target of a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub(crate) exchange: String,
    pub(crate) routing_key: String,
}

impl DeadLetter {
    /// Exchange the broker republishes rejected messages to
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Routing key of the republished messages, replacing the original one
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }
}

/// Definition of a RabbitMQ queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) dead_letter: Option<DeadLetter>,
}

impl QueueDefinition {
    /// Creates a non-durable queue definition without a dead-letter target.
    ///
    /// # Parameters
    /// * `name` - Queue name, unique within a topology
    ///
    /// # Returns
    /// A definition to refine with the builder methods
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where rejected messages go, if anywhere
    pub fn dead_letter_target(&self) -> Option<&DeadLetter> {
        self.dead_letter.as_ref()
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Routes rejected messages to `exchange` with `routing_key`.
    ///
    /// # Parameters
    /// * `exchange` - Dead-letter exchange, declared in the same topology
    /// * `routing_key` - Key the dead-letter exchange routes on
    pub fn dead_letter(mut self, exchange: &str, routing_key: &str) -> Self {
        self.dead_letter = Some(DeadLetter {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
        });
        self
    }
}

/// Binding of a queue to an exchange.
///
/// For direct exchanges the routing key must match exactly, for topic
/// exchanges it is a pattern, and fanout exchanges ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub(crate) queue_name: String,
    pub(crate) exchange_name: String,
    pub(crate) routing_key: String,
}

impl QueueBinding {
    /// Creates a binding for `queue` with an empty exchange and routing key.
    pub fn new(queue: &str) -> QueueBinding {
        QueueBinding {
            queue_name: queue.to_owned(),
            exchange_name: String::new(),
            routing_key: String::new(),
        }
    }

    /// Sets the exchange the queue is bound to.
    pub fn exchange(mut self, exchange: &str) -> Self {
        self.exchange_name = exchange.to_owned();
        self
    }

    /// Sets the binding key: an exact key for direct exchanges, a pattern
    /// for topic exchanges. Fanout exchanges ignore it.
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn key(&self) -> &str {
        &self.routing_key
    }
}
