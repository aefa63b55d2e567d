// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions
//!
//! Exchanges are the routing entities of RabbitMQ: they receive published
//! messages and forward them to bound queues according to their kind. This
//! module defines the supported kinds and a builder for exchange definitions.

/// The kinds of exchanges used by the service.
///
/// - Direct: routes on an exact match of the routing key
/// - Fanout: copies every message to all bound queues, ignoring the key
/// - Topic: routes on a wildcard pattern match of dot-separated keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Definition of a RabbitMQ exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
}

impl ExchangeDefinition {
    /// Creates a non-durable direct exchange definition.
    ///
    /// # Parameters
    /// * `name` - Exchange name, unique within a topology
    ///
    /// # Returns
    /// A definition to refine with the builder methods
    pub fn new(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            kind: ExchangeKind::Direct,
            durable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing behaviour of the exchange
    pub fn exchange_kind(&self) -> ExchangeKind {
        self.kind
    }

    /// Sets the exchange type.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Shorthand for `kind(ExchangeKind::Direct)`.
    pub fn direct(self) -> Self {
        self.kind(ExchangeKind::Direct)
    }

    /// Shorthand for `kind(ExchangeKind::Fanout)`.
    pub fn fanout(self) -> Self {
        self.kind(ExchangeKind::Fanout)
    }

    /// Shorthand for `kind(ExchangeKind::Topic)`.
    pub fn topic(self) -> Self {
        self.kind(ExchangeKind::Topic)
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }
}
