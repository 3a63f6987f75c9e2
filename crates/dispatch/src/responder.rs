//! Converts handler return values into HTTP responses.
//!
//! Plain bodies (`String`, `&'static str`, `Bytes`, `()`) leave the
//! `Content-Type` unset so the route's response strategy fills in its own.
//! [`Json`] and pre-built responses that carry a content type keep it.

use crate::envelope::ApiResponse;
use crate::error::RouteError;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn into_response(self) -> Result<Response<Bytes>, RouteError>;
}

impl<B> Responder for Response<B>
where
    B: Into<Bytes>,
{
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(self.map(Into::into))
    }
}

/// Sets the status code of the wrapped response.
impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        let (status, responder) = self;
        let mut response = responder.into_response()?;
        *response.status_mut() = status;
        Ok(response)
    }
}

impl<T: Responder> Responder for Box<T> {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        (*self).into_response()
    }
}

impl Responder for () {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(Response::new(Bytes::new()))
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(Response::new(Bytes::from_static(self.as_bytes())))
    }
}

impl Responder for String {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(Response::new(Bytes::from(self)))
    }
}

impl Responder for Bytes {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(Response::new(self))
    }
}

impl Responder for Vec<u8> {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        Ok(Response::new(Bytes::from(self)))
    }
}

/// Serializes `T` as the body with `Content-Type: application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        let body = serde_json::to_vec(&self.0)?;
        let mut response = Response::new(Bytes::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}

/// The envelope's status becomes the response status.
impl Responder for ApiResponse {
    fn into_response(self) -> Result<Response<Bytes>, RouteError> {
        let status = self.status();
        let body = self.to_vec()?;
        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = status;
        Ok(response)
    }
}
