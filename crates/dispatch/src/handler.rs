use crate::error::RouteError;
use crate::request::RequestContext;
use crate::responder::Responder;
use async_trait::async_trait;
use bytes::Bytes;
use http::Response;
use std::fmt;
use std::future::Future;

/// The endpoint a route's handler reference resolves to.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: RequestContext) -> Result<Response<Bytes>, RouteError>;
}

/// Holds an async fn taking the request context and returning `Result<impl Responder, E>`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut, R, E>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder + Send,
    E: Into<RouteError> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut, R, E> RequestHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send,
    R: Responder + Send,
    E: Into<RouteError> + Send,
{
    async fn invoke(&self, ctx: RequestContext) -> Result<Response<Bytes>, RouteError> {
        let responder = (self.f)(ctx).await.map_err(Into::into)?;
        responder.into_response()
    }
}
