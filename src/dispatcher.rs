// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Dispatcher
//!
//! Subscribes to queues and dispatches their deliveries to handlers. Handlers
//! are registered explicitly, one per queue, before consuming starts. Every
//! subscription runs in its own task and the subscriptions do not coordinate.

use crate::{consumer::consume, errors::AmqpError, handler::ConsumerHandler};
use futures_util::{future::join_all, StreamExt};
use lapin::{
    options::{BasicCancelOptions, BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Channel,
};
use opentelemetry::global;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A queue together with the handler processing its deliveries.
#[derive(Clone)]
pub struct QueueConsumer {
    pub(crate) queue: String,
    pub(crate) handler: Arc<dyn ConsumerHandler>,
}

impl QueueConsumer {
    /// Pairs `queue` with the handler of its deliveries.
    ///
    /// # Parameters
    /// * `queue` - Name of a declared queue
    /// * `handler` - Handler run once per delivery of that queue
    pub fn new(queue: &str, handler: Arc<dyn ConsumerHandler>) -> Self {
        QueueConsumer {
            queue: queue.to_owned(),
            handler,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn handler(&self) -> Arc<dyn ConsumerHandler> {
        self.handler.clone()
    }
}

/// Runs the registered handlers on the deliveries of their queues.
///
/// All subscriptions share one channel, whose prefetch bounds the unsettled
/// deliveries of each consumer.
pub struct RabbitMQDispatcher {
    channel: Arc<Channel>,
    consumer_tag_prefix: String,
    prefetch: u16,
    pub(crate) consumers: Vec<QueueConsumer>,
}

impl RabbitMQDispatcher {
    /// Creates a dispatcher without any registered queue.
    ///
    /// # Parameters
    /// * `channel` - Channel the subscriptions are created on
    /// * `consumer_tag_prefix` - Consumer tags are `<consumer_tag_prefix>.<queue>`
    /// * `prefetch` - Per-consumer prefetch applied with `basic.qos`
    pub fn new(channel: Arc<Channel>, consumer_tag_prefix: &str, prefetch: u16) -> Self {
        RabbitMQDispatcher {
            channel,
            consumer_tag_prefix: consumer_tag_prefix.to_owned(),
            prefetch,
            consumers: vec![],
        }
    }

    /// Registers `handler` for the deliveries of `queue`.
    ///
    /// Registering the same queue twice replaces the previous handler.
    ///
    /// # Returns
    /// The dispatcher, for chaining
    pub fn register(mut self, queue: &str, handler: Arc<dyn ConsumerHandler>) -> Self {
        self.consumers.retain(|c| c.queue != queue);
        self.consumers.push(QueueConsumer::new(queue, handler));
        self
    }

    /// Registers every consumer of `consumers`.
    pub fn register_all(self, consumers: Vec<QueueConsumer>) -> Self {
        consumers
            .into_iter()
            .fold(self, |dispatcher, c| dispatcher.register(&c.queue, c.handler))
    }

    /// Subscribes to every registered queue, then spawns one task per
    /// subscription processing its deliveries until the channel closes.
    ///
    /// Nothing is spawned unless every subscription succeeded. When one
    /// fails, the subscriptions created before it are cancelled.
    ///
    /// # Returns
    /// The running consumer tasks, or the first subscription error.
    pub async fn start(&self) -> Result<RunningConsumers, AmqpError> {
        if let Err(err) = self
            .channel
            .basic_qos(self.prefetch, BasicQosOptions { global: false })
            .await
        {
            error!(error = err.to_string(), "failure to configure qos");
            return Err(AmqpError::QoSDeclarationError(err.to_string()));
        }

        let mut subscriptions = vec![];

        for def in &self.consumers {
            let tag = format!("{}.{}", self.consumer_tag_prefix, def.queue);

            match self
                .channel
                .basic_consume(
                    &def.queue,
                    &tag,
                    BasicConsumeOptions {
                        no_local: false,
                        no_ack: false,
                        exclusive: false,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Ok(consumer) => subscriptions.push((def.clone(), tag, consumer)),
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        queue = def.queue,
                        "failure to create the consumer"
                    );
                    self.cancel(subscriptions.iter().map(|(_, tag, _)| tag.as_str()))
                        .await;
                    return Err(AmqpError::BindingConsumerError(def.queue.clone()));
                }
            }
        }

        let tasks = subscriptions
            .into_iter()
            .map(|(def, tag, mut consumer)| {
                info!(queue = def.queue, consumer_tag = tag, "consumer started");

                tokio::spawn(async move {
                    let tracer = global::tracer("amqp consumer");

                    while let Some(result) = consumer.next().await {
                        match result {
                            Ok(delivery) => {
                                if let Err(err) = consume(&tracer, &delivery, &def).await {
                                    error!(error = err.to_string(), queue = def.queue, "error consume msg")
                                }
                            }

                            Err(err) => error!(
                                error = err.to_string(),
                                queue = def.queue,
                                "errors consume msg"
                            ),
                        }
                    }

                    info!(queue = def.queue, "consumer stopped");
                })
            })
            .collect();

        Ok(RunningConsumers { tasks })
    }

    /// Subscribes to every registered queue and processes deliveries until
    /// every subscription ended.
    pub async fn consume_blocking(&self) -> Result<(), AmqpError> {
        self.start().await?.join().await
    }

    async fn cancel<'a>(&self, tags: impl Iterator<Item = &'a str>) {
        for tag in tags {
            if let Err(err) = self
                .channel
                .basic_cancel(tag, BasicCancelOptions { nowait: false })
                .await
            {
                warn!(error = err.to_string(), consumer_tag = tag, "failure to cancel consumer");
            }
        }
    }
}

/// Consumer tasks spawned by [`RabbitMQDispatcher::start`].
pub struct RunningConsumers {
    tasks: Vec<JoinHandle<()>>,
}

impl RunningConsumers {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stops every consumer task.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    /// Waits for every consumer task to end.
    ///
    /// # Returns
    /// An error when a task panicked or was aborted.
    pub async fn join(self) -> Result<(), AmqpError> {
        for res in join_all(self.tasks).await {
            if let Err(err) = res {
                error!(error = err.to_string(), "consumer task failed");
                return Err(AmqpError::ConsumerError(err.to_string()));
            }
        }

        Ok(())
    }
}
