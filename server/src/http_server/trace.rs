use axum::{
    extract::MatchedPath,
    http::{header, Request, Response},
};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Level;

use super::errors::ErrorCode;

/// Span per API request. `user.id` is filled in by the auth extractors once a token resolves.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tracer;

impl<Body> MakeSpan<Body> for Tracer {
    fn make_span(&mut self, request: &Request<Body>) -> tracing::Span {
        let route = http_route(request);
        let span_name = format!("{} {}", request.method(), route);

        tracing::span!(
            Level::INFO,
            "server.request",
            otel.name = span_name,
            kind = "server",
            url.path = %request.uri().path(),
            url.query = request.uri().query(),
            http.route = route,
            http.request.method = %request.method(),
            user_agent.original = request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok()),
            authenticated = request.headers().contains_key(header::AUTHORIZATION),
            user.id = tracing::field::Empty,

            http.response.status_code = tracing::field::Empty,
            http.response.header.content_type = tracing::field::Empty,
            foodgram.error_code = tracing::field::Empty,
        )
    }
}

impl<Body> OnResponse<Body> for Tracer {
    fn on_response(
        self,
        response: &Response<Body>,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        let status_code = response.status().as_u16();
        let error_code = response.extensions().get::<ErrorCode>().map(|code| code.0);

        tracing::event!(
            Level::INFO,
            status = status_code,
            error_code,
            latency = format_args!("{} ms", latency.as_millis()),
            "finished processing request"
        );

        span.record("http.response.status_code", status_code);
        span.record(
            "http.response.header.content_type",
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|h| h.to_str().ok()),
        );
        if let Some(code) = error_code {
            span.record("foodgram.error_code", code);
        }
    }
}

fn http_route<B>(req: &Request<B>) -> &str {
    req.extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str)
}
