// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # OpenTelemetry Context Propagation
//!
//! Carries the trace context through AMQP message headers: it is injected when
//! publishing and extracted again when a delivery is consumed, so that the
//! consumer span continues the trace of the HTTP request that produced it.
//! An inbound `traceparent` HTTP header becomes the parent of that request.

use axum::http::HeaderMap;
use lapin::{
    protocol::basic::AMQPProperties,
    types::{AMQPValue, ShortString},
};
use opentelemetry::{
    global::{self, BoxedSpan, BoxedTracer},
    propagation::{Extractor, Injector},
    trace::{SpanKind, TraceContextExt, Tracer},
    Context,
};
use std::{borrow::Cow, collections::BTreeMap};
use tracing::error;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Writes propagation fields into outgoing AMQP headers.
pub(crate) struct HeaderInjector<'a> {
    headers: &'a mut BTreeMap<ShortString, AMQPValue>,
}

impl<'a> HeaderInjector<'a> {
    pub(crate) fn new(headers: &'a mut BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.headers.insert(
            key.to_lowercase().into(),
            AMQPValue::LongString(value.into()),
        );
    }
}

/// Reads propagation fields from the headers of a delivery.
pub(crate) struct HeaderExtractor<'a> {
    headers: &'a BTreeMap<ShortString, AMQPValue>,
}

impl<'a> HeaderExtractor<'a> {
    pub(crate) fn new(headers: &'a BTreeMap<ShortString, AMQPValue>) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|header_value| {
            if let AMQPValue::LongString(header_value) = header_value {
                std::str::from_utf8(header_value.as_bytes())
                    .map_err(|e| error!("error decoding header value {:?}", e))
                    .ok()
            } else {
                None
            }
        })
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|header| header.as_str()).collect()
    }
}

/// Reads propagation fields from the headers of an HTTP request.
pub(crate) struct RequestHeaderExtractor<'a> {
    headers: &'a HeaderMap,
}

impl<'a> RequestHeaderExtractor<'a> {
    pub(crate) fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }
}

impl Extractor for RequestHeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|name| name.as_str()).collect()
    }
}

/// Returns the trace context the work of an HTTP request runs in.
///
/// The caller's trace context, when its headers carry one, becomes the parent
/// of the current request span.
///
/// # Parameters
/// * `headers` - Headers of the inbound request
///
/// # Returns
/// The context of the current span. When no OpenTelemetry layer records that
/// span, the caller's context, or an empty one.
pub(crate) fn request_context(headers: &HeaderMap) -> Context {
    let remote = global::get_text_map_propagator(|propagator| {
        propagator.extract(&RequestHeaderExtractor::new(headers))
    });

    let current = tracing::Span::current();
    if remote.span().span_context().is_valid() {
        current.set_parent(remote.clone());
    }

    let ctx = current.context();
    if ctx.span().span_context().is_valid() {
        ctx
    } else {
        remote
    }
}

/// Injects `ctx` into `headers` with the global propagator.
pub(crate) fn inject_context(ctx: &Context, headers: &mut BTreeMap<ShortString, AMQPValue>) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(ctx, &mut HeaderInjector::new(headers))
    });
}

/// Starts a consumer span named `name`, parented on the context carried by
/// the delivery headers.
pub(crate) fn new_span(
    props: &AMQPProperties,
    tracer: &BoxedTracer,
    name: &str,
) -> (Context, BoxedSpan) {
    let headers = props
        .headers()
        .as_ref()
        .map(|table| table.inner().clone())
        .unwrap_or_default();

    let ctx = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor::new(&headers))
    });

    let span = tracer
        .span_builder(Cow::from(name.to_owned()))
        .with_kind(SpanKind::Consumer)
        .start_with_context(tracer, &ctx);

    (ctx, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{
        propagation::TextMapPropagator,
        trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState},
    };
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    #[test]
    fn test_trace_context_survives_headers() {
        let trace_id = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
        let span_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        let ctx = Context::new().with_remote_span_context(SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        ));

        let propagator = TraceContextPropagator::new();
        let mut headers = BTreeMap::new();
        propagator.inject_context(&ctx, &mut HeaderInjector::new(&mut headers));

        assert!(headers.contains_key("traceparent"));

        let extracted = propagator.extract(&HeaderExtractor::new(&headers));
        assert_eq!(extracted.span().span_context().trace_id(), trace_id);
        assert_eq!(extracted.span().span_context().span_id(), span_id);
    }

    #[test]
    fn test_request_headers_are_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
                .parse()
                .unwrap(),
        );

        let extracted = TraceContextPropagator::new().extract(&RequestHeaderExtractor::new(&headers));
        assert_eq!(
            extracted.span().span_context().trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
        assert!(extracted.span().span_context().is_remote());
    }

    #[test]
    fn test_non_string_headers_are_ignored() {
        let mut headers = BTreeMap::new();
        headers.insert(ShortString::from("traceparent"), AMQPValue::LongInt(7));

        let extractor = HeaderExtractor::new(&headers);
        assert_eq!(extractor.get("traceparent"), None);
        assert_eq!(extractor.keys(), vec!["traceparent"]);
    }
}
