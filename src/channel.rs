// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! Opens the single broker connection the service uses and hands out channels
//! on it.

use crate::{config::Configs, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Establishes the AMQP connection described by `cfg`.
///
/// The connection is named after the application so it can be told apart in
/// the management UI.
pub async fn new_amqp_connection(cfg: &Configs) -> Result<Arc<Connection>, AmqpError> {
    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app.name.clone()));

    match Connection::connect(&cfg.rabbitmq.uri(), options).await {
        Ok(conn) => {
            debug!(
                host = cfg.rabbitmq.host,
                port = cfg.rabbitmq.port,
                "amqp connected"
            );
            Ok(Arc::new(conn))
        }
        Err(err) => {
            error!(error = err.to_string(), "failure to connect");
            Err(AmqpError::ConnectionError)
        }
    }
}

/// Creates a new channel on an established connection.
pub async fn new_amqp_channel(conn: &Connection) -> Result<Arc<Channel>, AmqpError> {
    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!(channel = c.id(), "channel created");
            Ok(Arc::new(c))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError)
        }
    }
}
