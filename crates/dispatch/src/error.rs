use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::error::Error;
use thiserror::Error;

/// Every way a request can fail between matching and the handler's response.
///
/// Each kind maps onto one http status. Known kinds carry a client-facing
/// message and optional data; [`RouteError::Internal`] keeps its cause for
/// the logs only.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("no route matches the request path")]
    NotFound,

    #[error("method not allowed, allowed methods: {allowed:?}")]
    MethodNotAllowed { allowed: Vec<Method> },

    #[error("authentication required")]
    Unauthenticated,

    #[error("access forbidden")]
    Forbidden,

    #[error("bad request: {message}")]
    BadRequest { message: String, data: Value },

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String, data: Value },

    #[error("internal error: {source}")]
    Internal {
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

pub const BAD_REQUEST_MESSAGE: &str = "bad_request";

impl RouteError {
    /// A 400 carrying the offending items in `data`.
    pub fn bad_request(data: impl Into<Value>) -> Self {
        Self::BadRequest { message: BAD_REQUEST_MESSAGE.to_owned(), data: data.into() }
    }

    /// Any other http error a handler wants to surface as is.
    pub fn status<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Status { status, message: message.to_string(), data: Value::Null }
    }

    pub fn with_data(self, data: impl Into<Value>) -> Self {
        match self {
            Self::BadRequest { message, .. } => Self::BadRequest { message, data: data.into() },
            Self::Status { status, message, .. } => Self::Status { status, message, data: data.into() },
            other => other,
        }
    }

    pub fn internal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Internal { source: e.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Status { status, .. } => *status,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Internal errors only show the reason phrase.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } | Self::Status { message, .. } => message.clone(),
            other => other.status_code().canonical_reason().unwrap_or_default().to_owned(),
        }
    }

    /// The data shown to clients, `Value::Null` when there is none.
    pub fn public_data(&self) -> Value {
        match self {
            Self::MethodNotAllowed { allowed } => {
                json!({ "allowed": allowed.iter().map(Method::as_str).collect::<Vec<_>>() })
            }
            Self::BadRequest { data, .. } | Self::Status { data, .. } => data.clone(),
            _ => Value::Null,
        }
    }

    pub fn allowed_methods(&self) -> Option<&[Method]> {
        match self {
            Self::MethodNotAllowed { allowed } => Some(allowed),
            _ => None,
        }
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl From<Box<dyn Error + Send + Sync>> for RouteError {
    fn from(source: Box<dyn Error + Send + Sync>) -> Self {
        Self::Internal { source }
    }
}

impl From<std::convert::Infallible> for RouteError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(e)
    }
}

/// Problems found while binding a route table to handlers, guards and strategies.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("route table must be set")]
    MissingTable,

    #[error("route '{route}' refers to unknown handler '{handler}'")]
    UnknownHandler { route: String, handler: String },

    #[error("route '{route}' refers to unknown guard '{guard}'")]
    UnknownGuard { route: String, guard: String },

    #[error("route '{route}' refers to unknown strategy '{strategy}'")]
    UnknownStrategy { route: String, strategy: String },
}
