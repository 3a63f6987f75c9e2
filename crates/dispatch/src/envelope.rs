//! The JSON envelope `{status, message?, data?}` shared by handler results and
//! error responses.

use crate::error::RouteError;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "message_is_empty")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "data_is_empty")]
    data: Value,
}

fn message_is_empty(message: &Option<String>) -> bool {
    message.as_deref().is_none_or(str::is_empty)
}

fn data_is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

impl ApiResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status: status.as_u16(), message: None, data: Value::Null }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Appends one item to `data`, turning it into an array first if needed.
    pub fn push_data(mut self, item: impl Into<Value>) -> Self {
        match &mut self.data {
            Value::Array(items) => items.push(item.into()),
            Value::Null => self.data = Value::Array(vec![item.into()]),
            other => {
                let previous = other.take();
                self.data = Value::Array(vec![previous, item.into()]);
            }
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<&RouteError> for ApiResponse {
    fn from(error: &RouteError) -> Self {
        Self::new(error.status_code()).with_message(error.public_message()).with_data(error.public_data())
    }
}
