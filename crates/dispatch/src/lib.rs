//! Request dispatch over a compiled [`micro_route::RouteTable`].
//!
//! A [`Dispatcher`] binds every compiled route to a registered handler, the
//! guards its pipeline names and its response strategy. Dispatching a request:
//!
//! 1. strips known locale prefixes from the path ([`LocaleSource`])
//! 2. finds the first route whose template and method match, answering 404
//!    or 405 through the default strategy otherwise
//! 3. runs the route's guards in order, stopping at the first failure
//! 4. invokes the handler, turning errors and panics into [`RouteError`]s
//! 5. renders the response, or the failure, with the route's
//!    [`ResponseStrategy`]
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use micro_dispatch::{handler_fn, Dispatcher, Json, RequestContext, RouteError};
//! use micro_route::{RouteCompiler, RouteConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RouteConfig::from_json(r#"{
//!     "paths": {"/users/{id:number}": {"methods": {"GET": {"handler": "users.show"}}}}
//! }"#)?;
//! let table = RouteCompiler::new(&config).compile()?;
//!
//! let dispatcher = Dispatcher::builder()
//!     .table(table)
//!     .handler("users.show", handler_fn(|ctx: RequestContext| async move {
//!         let id = ctx.param("id").ok_or(RouteError::NotFound)?.to_owned();
//!         Ok::<_, RouteError>(Json(json!({"id": id})))
//!     }))
//!     .build()?;
//!
//! let response = dispatcher.dispatch(http::Request::get("/users/7").body(Bytes::new())?).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod envelope;
mod error;
mod handler;
mod locale;
mod matcher;
mod request;
mod responder;

pub mod guard;
pub mod strategy;

pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuilder;
pub use envelope::ApiResponse;
pub use error::BuildError;
pub use error::RouteError;
pub use error::BAD_REQUEST_MESSAGE;
pub use guard::guard_fn;
pub use guard::Anonymous;
pub use guard::Authenticator;
pub use guard::Guard;
pub use handler::handler_fn;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use locale::normalize_path;
pub use locale::LocaleSource;
pub use locale::StaticLocales;
pub use locale::TranslationDir;
pub use request::PathParams;
pub use request::Principal;
pub use request::RequestContext;
pub use responder::Json;
pub use responder::Responder;
pub use strategy::ResponseStrategy;
