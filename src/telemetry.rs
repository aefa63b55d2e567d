// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Logging and Tracing Setup
//!
//! Installs one subscriber for logs and spans. `tracing` spans are bridged to
//! OpenTelemetry so that the trace context of an HTTP request is the one
//! injected into the AMQP headers of the messages it publishes.

use crate::config::AppConfigs;
use opentelemetry::{global, trace::TracerProvider as _};
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider, Resource};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

/// Installs the W3C trace-context propagator, the global tracer provider and
/// the global tracing subscriber.
///
/// # Parameters
/// * `cfg` - Application settings: service name, default log level and
///   output format. `RUST_LOG` takes precedence over the configured level.
///
/// # Returns
/// The installed tracer provider, to be shut down before the process exits.
/// Fails when a subscriber is already installed.
pub fn init(cfg: &AppConfigs) -> Result<SdkTracerProvider, TryInitError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let provider = SdkTracerProvider::builder()
        .with_resource(
            Resource::builder()
                .with_service_name(cfg.name.clone())
                .build(),
        )
        .build();
    global::set_tracer_provider(provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(cfg.name.clone()));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    if cfg.log_json {
        registry
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }

    Ok(provider)
}
