// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Declares the topology, starts one consumer per queue and serves the HTTP
//! endpoints that publish to the exchanges.

use anyhow::{Context, Result};
use exchange_patterns::{
    api::{self, AppState},
    channel::{new_amqp_channel, new_amqp_connection},
    definitions::standard_topology,
    dispatcher::RabbitMQDispatcher,
    listeners::standard_listeners,
    producer::Producer,
    publisher::RabbitMQPublisher,
    telemetry,
    topology::{AmqpTopology, Topology},
    Configs,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let (cfg, warnings) = Configs::from_env();
    let tracer_provider =
        telemetry::init(&cfg.app).context("failed to install the tracing subscriber")?;

    for warning in &warnings {
        warn!(
            env_var = warning.env_var,
            value = warning.value,
            "invalid value, using default"
        );
    }

    info!(
        app = cfg.app.name,
        rabbitmq_host = cfg.rabbitmq.host,
        rabbitmq_port = cfg.rabbitmq.port,
        http_addr = cfg.http.addr(),
        "starting"
    );

    let conn = new_amqp_connection(&cfg)
        .await
        .context("failed to connect to rabbitmq")?;
    let channel = new_amqp_channel(&conn).await.context("failed to open channel")?;

    let topology = standard_topology(&cfg.topology);
    AmqpTopology::new(channel.clone())
        .install(&topology)
        .await
        .context("failed to install the topology")?;
    info!("topology installed");

    let consumer_channel = new_amqp_channel(&conn)
        .await
        .context("failed to open consumer channel")?;
    let consumers = RabbitMQDispatcher::new(
        consumer_channel,
        &cfg.app.name,
        cfg.rabbitmq.prefetch,
    )
    .register_all(standard_listeners(&cfg.topology))
    .start()
    .await
    .context("failed to start the consumers")?;
    info!(count = consumers.len(), "consumers started");

    let producer = Producer::new(RabbitMQPublisher::new(channel), &cfg.topology);
    let app = api::router(AppState::new(producer));

    let listener = TcpListener::bind(cfg.http.addr())
        .await
        .context("failed to bind the http listener")?;
    info!(address = cfg.http.addr(), "http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    consumers.abort();
    if let Err(err) = conn.close(200, "shutdown").await {
        error!(error = err.to_string(), "failure to close the amqp connection");
    }
    if let Err(err) = tracer_provider.shutdown() {
        error!(error = err.to_string(), "failure to shut down the tracer provider");
    }

    info!("shutdown complete");
    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = err.to_string(), "failure to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = err.to_string(), "failure to listen for sigterm");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
