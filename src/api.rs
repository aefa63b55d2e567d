// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # HTTP Interface
//!
//! Thin endpoints triggering the producer:
//!
//! - `POST /api/send/direct` with a JSON [`Message`]
//! - `POST /api/send/topic?routingKey=<key>` with a raw text body
//! - `POST /api/send/fanout` with a raw text body
//! - `GET /health`
//!
//! Successful sends answer `200` with a plain text confirmation. A failed
//! publish answers `500` with a generic text. Every publish carries the trace
//! context of its request, continuing the caller's trace when the request has
//! a `traceparent` header.

use crate::{errors::MessagingError, message::Message, otel, producer::Producer};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{error, Level};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub producer: Arc<Producer>,
}

impl AppState {
    pub fn new(producer: Producer) -> Self {
        AppState {
            producer: Arc::new(producer),
        }
    }
}

/// Builds the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/send/direct", post(send_direct))
        .route("/api/send/topic", post(send_topic))
        .route("/api/send/fanout", post(send_fanout))
        .layer(
            TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// A publish failure as seen by HTTP callers.
#[derive(Debug)]
pub struct ApiError(MessagingError);

impl From<MessagingError> for ApiError {
    fn from(err: MessagingError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = self.0.to_string(), "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to send message",
        )
            .into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn send_direct(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<Message>,
) -> Result<String, ApiError> {
    state
        .producer
        .send_direct(&otel::request_context(&headers), &message)
        .await?;

    Ok(format!("Message sent to direct exchange: {}", message.message))
}

#[derive(Debug, Deserialize)]
pub struct TopicParams {
    #[serde(rename = "routingKey")]
    pub routing_key: String,
}

pub async fn send_topic(
    State(state): State<AppState>,
    Query(params): Query<TopicParams>,
    headers: HeaderMap,
    body: String,
) -> Result<String, ApiError> {
    state
        .producer
        .send_topic(&otel::request_context(&headers), &params.routing_key, &body)
        .await?;

    Ok(format!(
        "Message sent to topic exchange (routing key: {})",
        params.routing_key
    ))
}

pub async fn send_fanout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<String, ApiError> {
    state
        .producer
        .send_fanout(&otel::request_context(&headers), &body)
        .await?;

    Ok("Message sent to fanout exchange!".to_owned())
}
