use super::{error_response_with, ResponseStrategy};
use crate::error::RouteError;
use bytes::Bytes;
use http::{Response, StatusCode};
use std::fmt;
use std::sync::Arc;

/// Renders the error page body for a status.
pub trait ErrorPageRenderer: Send + Sync {
    fn render(&self, status: StatusCode, message: &str) -> String;
}

/// A minimal standalone page with the status and message as heading.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicErrorPage;

impl ErrorPageRenderer for BasicErrorPage {
    fn render(&self, status: StatusCode, message: &str) -> String {
        let message = escape(message);
        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{code} {message}</title></head>\n\
             <body><h1>{code}</h1><p>{message}</p></body>\n</html>\n",
            code = status.as_u16(),
        )
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Renders failures as html error pages.
#[derive(Clone)]
pub struct HtmlStrategy {
    renderer: Arc<dyn ErrorPageRenderer>,
}

impl HtmlStrategy {
    pub fn new(renderer: impl ErrorPageRenderer + 'static) -> Self {
        Self { renderer: Arc::new(renderer) }
    }
}

impl Default for HtmlStrategy {
    fn default() -> Self {
        Self::new(BasicErrorPage)
    }
}

impl fmt::Debug for HtmlStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlStrategy").finish_non_exhaustive()
    }
}

impl ResponseStrategy for HtmlStrategy {
    fn content_type(&self) -> &str {
        "text/html; charset=utf-8"
    }

    fn error_response(&self, e: &RouteError) -> Response<Bytes> {
        let page = self.renderer.render(e.status_code(), &e.public_message());
        error_response_with(e, self.content_type(), Bytes::from(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    #[test]
    fn not_found_page() {
        let response = HtmlStrategy::default().error_response(&RouteError::NotFound);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html; charset=utf-8");

        let page = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(page.contains("<h1>404</h1>"));
        assert!(page.contains("Not Found"));
    }

    #[test]
    fn message_is_escaped() {
        let page = BasicErrorPage.render(StatusCode::BAD_REQUEST, "<script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn custom_renderer() {
        struct Plain;
        impl ErrorPageRenderer for Plain {
            fn render(&self, status: StatusCode, _message: &str) -> String {
                format!("error {}", status.as_u16())
            }
        }

        let response = HtmlStrategy::new(Plain).error_response(&RouteError::internal("secret"));
        assert_eq!(response.body(), &Bytes::from_static(b"error 500"));
    }
}
