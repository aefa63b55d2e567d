// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Service Topology
//!
//! The exchanges, queues and bindings this service declares at startup:
//!
//! ```text
//! direct exchange ──(direct key)──▶ direct queue ──reject──▶ dead-letter exchange
//!                                                               │ (dlq key)
//!                                                               ▼
//!                                                         dead-letter queue
//! topic exchange ──(log.error)──▶ error-logs queue
//!                ──(log.#)──────▶ all-logs queue
//! fanout exchange ──────────────▶ sms / email / push queues
//! ```

use crate::{
    config::TopologyConfigs,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
    topology::TopologyDefinition,
};

/// Binding pattern of the error-logs queue
pub const ERROR_LOGS_BINDING_KEY: &str = "log.error";
/// Binding pattern of the all-logs queue
pub const ALL_LOGS_BINDING_KEY: &str = "log.#";

/// Builds the service topology from the configured names.
pub fn standard_topology(names: &TopologyConfigs) -> TopologyDefinition {
    TopologyDefinition::new()
        .exchange(ExchangeDefinition::new(&names.direct_exchange).direct().durable())
        .exchange(ExchangeDefinition::new(&names.topic_exchange).topic().durable())
        .exchange(ExchangeDefinition::new(&names.fanout_exchange).fanout().durable())
        .exchange(
            ExchangeDefinition::new(&names.dead_letter_exchange)
                .direct()
                .durable(),
        )
        .queue(
            QueueDefinition::new(&names.direct_queue)
                .durable()
                .dead_letter(&names.dead_letter_exchange, &names.dead_letter_routing_key),
        )
        .queue(QueueDefinition::new(&names.error_logs_queue).durable())
        .queue(QueueDefinition::new(&names.all_logs_queue).durable())
        .queue(QueueDefinition::new(&names.sms_queue).durable())
        .queue(QueueDefinition::new(&names.email_queue).durable())
        .queue(QueueDefinition::new(&names.push_queue).durable())
        .queue(QueueDefinition::new(&names.dead_letter_queue).durable())
        .queue_binding(
            QueueBinding::new(&names.direct_queue)
                .exchange(&names.direct_exchange)
                .routing_key(&names.direct_routing_key),
        )
        .queue_binding(
            QueueBinding::new(&names.error_logs_queue)
                .exchange(&names.topic_exchange)
                .routing_key(ERROR_LOGS_BINDING_KEY),
        )
        .queue_binding(
            QueueBinding::new(&names.all_logs_queue)
                .exchange(&names.topic_exchange)
                .routing_key(ALL_LOGS_BINDING_KEY),
        )
        .queue_binding(QueueBinding::new(&names.sms_queue).exchange(&names.fanout_exchange))
        .queue_binding(QueueBinding::new(&names.email_queue).exchange(&names.fanout_exchange))
        .queue_binding(QueueBinding::new(&names.push_queue).exchange(&names.fanout_exchange))
        .queue_binding(
            QueueBinding::new(&names.dead_letter_queue)
                .exchange(&names.dead_letter_exchange)
                .routing_key(&names.dead_letter_routing_key),
        )
}
