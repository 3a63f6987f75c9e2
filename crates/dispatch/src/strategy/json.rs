use super::{error_response_with, ResponseStrategy};
use crate::envelope::ApiResponse;
use crate::error::RouteError;
use bytes::Bytes;
use http::Response;
use tracing::error;

/// Renders failures as the `{status, message?, data?}` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStrategy;

impl ResponseStrategy for JsonStrategy {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn error_response(&self, e: &RouteError) -> Response<Bytes> {
        let body = match ApiResponse::from(e).to_vec() {
            Ok(body) => Bytes::from(body),
            Err(cause) => {
                error!(%cause, "failed to serialize error envelope");
                Bytes::new()
            }
        };
        error_response_with(e, self.content_type(), body)
    }
}
