// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Scenarios against a live RabbitMQ, configured with the `RABBITMQ_*`
//! environment variables. Every test declares its own uniquely named topology
//! and deletes it afterwards.
//!
//! Run with `cargo test -- --ignored`.

use exchange_patterns::{
    channel::{new_amqp_channel, new_amqp_connection},
    config::TopologyConfigs,
    definitions::standard_topology,
    dispatcher::RabbitMQDispatcher,
    listeners::standard_listeners,
    message::decode_text,
    producer::Producer,
    publisher::RabbitMQPublisher,
    topology::{AmqpTopology, Topology},
    Configs, Message,
};
use exchange_patterns::errors::AmqpError;
use lapin::{
    options::{BasicGetOptions, ExchangeDeleteOptions, QueueDeclareOptions, QueueDeleteOptions},
    types::FieldTable,
    Channel, Connection,
};
use opentelemetry::Context;
use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, Instant};
use uuid::Uuid;

struct Harness {
    conn: Arc<Connection>,
    channel: Arc<Channel>,
    names: TopologyConfigs,
    producer: Producer,
}

impl Harness {
    async fn new() -> Harness {
        let (cfg, _) = Configs::from_env();
        let suffix = Uuid::new_v4().simple().to_string();
        let d = TopologyConfigs::default();
        let names = TopologyConfigs {
            direct_exchange: format!("{}.{suffix}", d.direct_exchange),
            direct_queue: format!("{}.{suffix}", d.direct_queue),
            direct_routing_key: d.direct_routing_key,
            dead_letter_exchange: format!("{}.{suffix}", d.dead_letter_exchange),
            dead_letter_queue: format!("{}.{suffix}", d.dead_letter_queue),
            dead_letter_routing_key: d.dead_letter_routing_key,
            topic_exchange: format!("{}.{suffix}", d.topic_exchange),
            error_logs_queue: format!("{}.{suffix}", d.error_logs_queue),
            all_logs_queue: format!("{}.{suffix}", d.all_logs_queue),
            fanout_exchange: format!("{}.{suffix}", d.fanout_exchange),
            sms_queue: format!("{}.{suffix}", d.sms_queue),
            email_queue: format!("{}.{suffix}", d.email_queue),
            push_queue: format!("{}.{suffix}", d.push_queue),
            fail_keyword: d.fail_keyword,
        };

        let conn = new_amqp_connection(&cfg).await.unwrap();
        let channel = new_amqp_channel(&conn).await.unwrap();
        AmqpTopology::new(channel.clone())
            .install(&standard_topology(&names))
            .await
            .unwrap();

        let producer = Producer::new(RabbitMQPublisher::new(channel.clone()), &names);

        Harness {
            conn,
            channel,
            names,
            producer,
        }
    }

    /// Consumes the direct queue with the standard handler only, leaving the
    /// dead-letter queue untouched so it can be inspected.
    async fn start_direct_consumer(&self) -> tokio::task::JoinHandle<()> {
        let listener = standard_listeners(&self.names)
            .into_iter()
            .find(|l| l.queue() == self.names.direct_queue)
            .unwrap();
        let channel = new_amqp_channel(&self.conn).await.unwrap();
        let dispatcher = RabbitMQDispatcher::new(channel, "broker-test", 1)
            .register(listener.queue(), listener.handler());

        tokio::spawn(async move {
            let _ = dispatcher.consume_blocking().await;
        })
    }

    async fn get(&self, queue: &str) -> Option<Vec<u8>> {
        self.channel
            .basic_get(queue, BasicGetOptions { no_ack: true })
            .await
            .unwrap()
            .map(|msg| msg.delivery.data)
    }

    /// Waits until `queue` yields a message or `timeout` elapses.
    async fn wait_for(&self, queue: &str, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(data) = self.get(queue).await {
                return Some(data);
            }
            sleep(Duration::from_millis(50)).await;
        }
        None
    }

    async fn drain(&self, queue: &str) -> Vec<String> {
        sleep(Duration::from_millis(300)).await;
        let mut bodies = vec![];
        while let Some(data) = self.get(queue).await {
            bodies.push(decode_text(&data, queue).unwrap());
        }
        bodies
    }

    async fn teardown(self) {
        let n = &self.names;
        for queue in [
            &n.direct_queue,
            &n.dead_letter_queue,
            &n.error_logs_queue,
            &n.all_logs_queue,
            &n.sms_queue,
            &n.email_queue,
            &n.push_queue,
        ] {
            let _ = self
                .channel
                .queue_delete(queue, QueueDeleteOptions::default())
                .await;
        }
        for exchange in [
            &n.direct_exchange,
            &n.dead_letter_exchange,
            &n.topic_exchange,
            &n.fanout_exchange,
        ] {
            let _ = self
                .channel
                .exchange_delete(exchange, ExchangeDeleteOptions::default())
                .await;
        }
        let _ = self.conn.close(200, "test done").await;
    }
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn direct_message_is_acknowledged() {
    let h = Harness::new().await;
    let consumer = h.start_direct_consumer().await;

    h.producer
        .send_direct(&Context::new(), &Message::new("hello"))
        .await
        .unwrap();

    assert_eq!(
        h.wait_for(&h.names.dead_letter_queue, Duration::from_secs(2)).await,
        None
    );
    assert_eq!(h.get(&h.names.direct_queue).await, None);

    consumer.abort();
    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn failing_direct_message_is_dead_lettered_once() {
    let h = Harness::new().await;
    let consumer = h.start_direct_consumer().await;

    h.producer
        .send_direct(&Context::new(), &Message::new("please fail now"))
        .await
        .unwrap();

    let data = h
        .wait_for(&h.names.dead_letter_queue, Duration::from_secs(5))
        .await
        .expect("message was not dead-lettered");
    let message = Message::decode(&data, &h.names.dead_letter_queue).unwrap();
    assert_eq!(message, Message::new("please fail now"));
    assert_eq!(
        h.wait_for(&h.names.dead_letter_queue, Duration::from_millis(500)).await,
        None
    );

    consumer.abort();
    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn direct_message_round_trips() {
    let h = Harness::new().await;

    h.producer
        .send_direct(&Context::new(), &Message::new("round trip"))
        .await
        .unwrap();

    let data = h
        .wait_for(&h.names.direct_queue, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(
        Message::decode(&data, &h.names.direct_queue).unwrap().message,
        "round trip"
    );

    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn log_error_reaches_both_log_queues() {
    let h = Harness::new().await;

    h.producer
        .send_topic(&Context::new(), "log.error", "disk full")
        .await
        .unwrap();

    assert_eq!(h.drain(&h.names.error_logs_queue).await, vec!["disk full"]);
    assert_eq!(h.drain(&h.names.all_logs_queue).await, vec!["disk full"]);

    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn log_info_reaches_only_all_logs() {
    let h = Harness::new().await;

    h.producer
        .send_topic(&Context::new(), "log.info", "started")
        .await
        .unwrap();

    assert_eq!(h.drain(&h.names.all_logs_queue).await, vec!["started"]);
    assert!(h.drain(&h.names.error_logs_queue).await.is_empty());

    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn fanout_reaches_every_notification_queue_once() {
    let h = Harness::new().await;

    h.producer
        .send_fanout(&Context::new(), "promo")
        .await
        .unwrap();

    for queue in [&h.names.sms_queue, &h.names.email_queue, &h.names.push_queue] {
        assert_eq!(h.drain(queue).await, vec!["promo"], "queue {queue}");
    }

    h.teardown().await;
}

#[tokio::test]
#[ignore = "needs a running RabbitMQ"]
async fn unknown_queue_fails_startup_without_leftover_consumers() {
    let h = Harness::new().await;
    let missing = format!("{}.missing", h.names.direct_queue);

    let listener = standard_listeners(&h.names)
        .into_iter()
        .find(|l| l.queue() == h.names.direct_queue)
        .unwrap();
    let channel = new_amqp_channel(&h.conn).await.unwrap();
    let result = RabbitMQDispatcher::new(channel, "broker-test", 1)
        .register(listener.queue(), listener.handler())
        .register(&missing, listener.handler())
        .start()
        .await;

    assert!(matches!(result, Err(AmqpError::BindingConsumerError(q)) if q == missing));

    sleep(Duration::from_millis(300)).await;
    let check_channel = new_amqp_channel(&h.conn).await.unwrap();
    let direct = check_channel
        .queue_declare(
            &h.names.direct_queue,
            QueueDeclareOptions {
                passive: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .unwrap();
    assert_eq!(direct.consumer_count(), 0);

    h.teardown().await;
}
