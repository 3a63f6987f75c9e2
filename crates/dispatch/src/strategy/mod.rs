//! Response strategies decide how a route's results and failures are rendered.
//!
//! Each route names a strategy (`"json"` by default). Successful handler
//! responses are only decorated with the strategy's content type when they
//! carry none. Failures are rendered entirely by the strategy.

mod html;
mod json;

pub use html::BasicErrorPage;
pub use html::ErrorPageRenderer;
pub use html::HtmlStrategy;
pub use json::JsonStrategy;

use crate::error::RouteError;
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Response};

pub trait ResponseStrategy: Send + Sync {
    /// The content type of responses rendered by this strategy.
    fn content_type(&self) -> &str;

    /// Fills in the default content type, keeping the handler's own if set.
    fn decorate(&self, mut response: Response<Bytes>) -> Response<Bytes> {
        if !response.headers().contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(self.content_type()) {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
        }
        response
    }

    /// Renders a failure. Internal errors must not expose their cause.
    fn error_response(&self, error: &RouteError) -> Response<Bytes>;
}

/// Assembles an error response with the status of `error`, plus an `Allow`
/// header when the method was not allowed.
pub(crate) fn error_response_with(error: &RouteError, content_type: &str, body: Bytes) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = error.status_code();

    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }

    if let Some(allowed) = error.allowed_methods() {
        let allow = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
        if let Ok(value) = HeaderValue::from_str(&allow) {
            response.headers_mut().insert(ALLOW, value);
        }
    }

    response
}
