//! 请求上下文中间件

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use plug_telemetry::{RequestIds, new_request_ids};
use std::time::Instant;
use tracing::{Instrument, debug};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// 为每个请求分配 request_id/trace_id，在 span 内处理并记录状态码与耗时
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %req.method(),
        path = %req.uri().path(),
        status = tracing::field::Empty,
        elapsed_ms = tracing::field::Empty,
    );

    let started_at = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    span.record("status", response.status().as_u16());
    span.record("elapsed_ms", elapsed_ms);
    span.in_scope(|| debug!("request handled"));

    attach_ids(&mut response, &ids);
    response
}

fn attach_ids(response: &mut Response, ids: &RequestIds) {
    let headers = response.headers_mut();
    for (name, value) in [
        (REQUEST_ID_HEADER, &ids.request_id),
        (TRACE_ID_HEADER, &ids.trace_id),
    ] {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
}
