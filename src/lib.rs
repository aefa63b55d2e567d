// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Publishing and consuming through RabbitMQ with direct, topic and fanout
//! exchanges, plus a dead-letter queue for rejected messages.
//!
//! ```text
//! HTTP → Producer → exchange → queue → Dispatcher → handler ─ack─▶ done
//!                                                      └─reject─▶ dead-letter queue
//! ```

mod consumer;
mod otel;

pub mod api;
pub mod channel;
pub mod config;
pub mod definitions;
pub mod dispatcher;
pub mod errors;
pub mod exchange;
pub mod handler;
pub mod listeners;
pub mod message;
pub mod producer;
pub mod publisher;
pub mod queue;
pub mod routing;
pub mod telemetry;
pub mod topology;

pub use config::Configs;
pub use consumer::Settlement;
pub use message::Message;
