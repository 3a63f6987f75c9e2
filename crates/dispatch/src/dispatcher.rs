//! The dispatcher: matches requests against a compiled route table, runs the
//! route's guards and handler, and renders the result with the route's
//! response strategy.

use crate::error::{BuildError, RouteError};
use crate::guard::{Anonymous, Authenticator, Guard, GuardChain};
use crate::handler::RequestHandler;
use crate::locale::{normalize_path, LocaleSource};
use crate::matcher::{BoundRoute, BoundTable, RouteMatch};
use crate::request::{PathParams, RequestContext};
use crate::strategy::{HtmlStrategy, JsonStrategy, ResponseStrategy};
use arc_swap::ArcSwap;
use bytes::Bytes;
use futures::FutureExt;
use http::uri::PathAndQuery;
use http::{Method, Request, Response, Uri};
use micro_route::{ResolvedRoute, RouteTable};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub struct DispatcherBuilder {
    table: Option<RouteTable>,
    registry: Registry,
}

struct Registry {
    handlers: HashMap<String, Arc<dyn RequestHandler>>,
    guards: HashMap<String, Arc<dyn Guard>>,
    strategies: HashMap<String, Arc<dyn ResponseStrategy>>,
    authenticator: Arc<dyn Authenticator>,
    locales: Option<Arc<dyn LocaleSource>>,
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.table.as_ref().map(RouteTable::len))
            .field("handlers", &self.registry.handlers.keys().collect::<Vec<_>>())
            .field("guards", &self.registry.guards.keys().collect::<Vec<_>>())
            .field("strategies", &self.registry.strategies.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DispatcherBuilder {
    fn new() -> Self {
        let mut strategies: HashMap<String, Arc<dyn ResponseStrategy>> = HashMap::new();
        strategies.insert("json".to_owned(), Arc::new(JsonStrategy));
        strategies.insert("html".to_owned(), Arc::new(HtmlStrategy::default()));

        Self {
            table: None,
            registry: Registry {
                handlers: HashMap::new(),
                guards: HashMap::new(),
                strategies,
                authenticator: Arc::new(Anonymous),
                locales: None,
            },
        }
    }

    pub fn table(mut self, table: RouteTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Registers the handler routes refer to as `name`.
    pub fn handler(mut self, name: impl Into<String>, handler: impl RequestHandler + 'static) -> Self {
        self.registry.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Registers the custom guard a `middleware` requirement refers to as `name`.
    pub fn guard(mut self, name: impl Into<String>, guard: impl Guard + 'static) -> Self {
        self.registry.guards.insert(name.into(), Arc::new(guard));
        self
    }

    /// Registers a response strategy, replacing the built-in one of the same name.
    pub fn strategy(mut self, name: impl Into<String>, strategy: impl ResponseStrategy + 'static) -> Self {
        self.registry.strategies.insert(name.into(), Arc::new(strategy));
        self
    }

    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.registry.authenticator = Arc::new(authenticator);
        self
    }

    pub fn locales(mut self, locales: impl LocaleSource + 'static) -> Self {
        self.registry.locales = Some(Arc::new(locales));
        self
    }

    /// Binds every route of the table, failing on the first reference that
    /// names no registered handler, guard or strategy.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let table = self.table.ok_or(BuildError::MissingTable)?;
        let bound = self.registry.bind(table)?;
        info!(routes = bound.routes.len(), "dispatcher ready");
        Ok(Dispatcher { table: ArcSwap::from_pointee(bound), registry: self.registry })
    }
}

impl Registry {
    fn bind(&self, table: RouteTable) -> Result<BoundTable, BuildError> {
        let default_strategy = self.strategy_for(table.default_strategy(), "default")?;

        let routes = table
            .iter()
            .map(|route| {
                let handler = self.handlers.get(route.handler()).cloned().ok_or_else(|| BuildError::UnknownHandler {
                    route: describe(route),
                    handler: route.handler().to_owned(),
                })?;
                let guards = GuardChain::bind(route, &self.authenticator, &self.guards)?;
                let strategy = self.strategy_for(route.strategy(), &describe(route))?;
                Ok(BoundRoute { route: Arc::clone(route), handler, guards, strategy })
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        Ok(BoundTable { routes, default_strategy, table })
    }

    fn strategy_for(&self, name: &str, route: &str) -> Result<Arc<dyn ResponseStrategy>, BuildError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| BuildError::UnknownStrategy { route: route.to_owned(), strategy: name.to_owned() })
    }
}

fn describe(route: &ResolvedRoute) -> String {
    format!("{} {}", route.method(), route.path())
}

/// Serves requests from a bound route table.
///
/// The table can be swapped with [`Dispatcher::reload`] while requests are in
/// flight; each request sees one table from start to end.
pub struct Dispatcher {
    table: ArcSwap<BoundTable>,
    registry: Registry,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("routes", &self.table.load().routes.len()).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
#[error("handler panicked: {0}")]
struct HandlerPanic(String);

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The compiled table currently served.
    pub fn route_table(&self) -> RouteTable {
        self.table.load().table.clone()
    }

    /// Binds `table` with the registered handlers, guards and strategies and
    /// swaps it in. On error the current table stays in service.
    pub fn reload(&self, table: RouteTable) -> Result<(), BuildError> {
        let bound = self.registry.bind(table)?;
        info!(routes = bound.routes.len(), "route table reloaded");
        self.table.store(Arc::new(bound));
        Ok(())
    }

    /// Strips known locale prefixes from `path`.
    pub fn normalize_path(&self, path: &str) -> String {
        match &self.registry.locales {
            Some(source) => normalize_path(path, &source.locales()),
            None => path.to_owned(),
        }
    }

    /// Finds the route `method` and `path` would be dispatched to.
    pub fn route_for(&self, method: &Method, path: &str) -> Result<(Arc<ResolvedRoute>, PathParams), RouteError> {
        let path = self.normalize_path(path);
        let table = self.table.load();
        match table.at(method, &path) {
            RouteMatch::Found { route, params } => Ok((Arc::clone(&route.route), params)),
            RouteMatch::MethodNotAllowed(allowed) => Err(RouteError::MethodNotAllowed { allowed }),
            RouteMatch::NotFound => Err(RouteError::NotFound),
        }
    }

    /// Handles one request. Every failure, including a panicking handler,
    /// becomes a response rendered by the route's strategy, or by the
    /// default strategy when no route matched.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let table = self.table.load_full();
        let path = self.normalize_path(request.uri().path());
        let request = rewrite_path(request, &path);
        let method = request.method().clone();

        match table.at(&method, &path) {
            RouteMatch::NotFound => {
                fail(table.default_strategy.as_ref(), &method, &path, &RouteError::NotFound)
            }
            RouteMatch::MethodNotAllowed(allowed) => {
                let e = RouteError::MethodNotAllowed { allowed };
                fail(table.default_strategy.as_ref(), &method, &path, &e)
            }
            RouteMatch::Found { route, params } => {
                debug!(%method, %path, route = route.route.path(), handler = route.route.handler(), "route matched");
                let ctx = RequestContext::new(Arc::new(request), params, Arc::clone(&route.route));

                let result = AssertUnwindSafe(serve(route, ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(RouteError::internal(HandlerPanic(panic_message(&*panic)))));

                match result {
                    Ok(response) => route.strategy.decorate(response),
                    Err(e) => fail(route.strategy.as_ref(), &method, &path, &e),
                }
            }
        }
    }
}

async fn serve(route: &BoundRoute, mut ctx: RequestContext) -> Result<Response<Bytes>, RouteError> {
    route.guards.run(&mut ctx).await?;
    route.handler.invoke(ctx).await
}

fn fail(strategy: &dyn ResponseStrategy, method: &Method, path: &str, e: &RouteError) -> Response<Bytes> {
    if e.is_internal() {
        error!(%method, path, cause = %e, "request failed");
    } else {
        debug!(%method, path, status = %e.status_code(), "request rejected");
    }
    strategy.error_response(e)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Replaces the request's path, keeping its query.
fn rewrite_path(request: Request<Bytes>, path: &str) -> Request<Bytes> {
    if request.uri().path() == path {
        return request;
    }

    let (mut parts, body) = request.into_parts();
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    match PathAndQuery::try_from(path_and_query) {
        Ok(path_and_query) => {
            uri_parts.path_and_query = Some(path_and_query);
            match Uri::from_parts(uri_parts) {
                Ok(uri) => parts.uri = uri,
                Err(e) => warn!(cause = %e, "cannot rewrite request uri"),
            }
        }
        Err(e) => warn!(cause = %e, "cannot rewrite request path"),
    }

    Request::from_parts(parts, body)
}
