//! Request tracing utilities.

use std::future::Future;
use tracing::{info_span, Instrument, Span};

/// Create the span that carries a request's correlation id.
///
/// `user_id` starts empty and is filled in once the caller is authenticated.
pub fn request_span(correlation_id: &str, method: &str, path: &str) -> Span {
    info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %method,
        path = %path,
        user_id = tracing::field::Empty,
    )
}

/// Record the authenticated caller on the current request span.
pub fn record_user(user_id: &dyn std::fmt::Display) {
    Span::current().record("user_id", tracing::field::display(user_id));
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instrument_future_passes_output_through() {
        let span = request_span("corr-1-abc", "GET", "/health");
        let out = instrument_future(async { 7 }, span).await;
        assert_eq!(out, 7);
    }

    #[test]
    fn test_record_user_outside_span_is_harmless() {
        record_user(&"usr_123");
    }
}
