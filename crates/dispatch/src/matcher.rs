use crate::guard::GuardChain;
use crate::handler::RequestHandler;
use crate::request::PathParams;
use crate::strategy::ResponseStrategy;
use http::Method;
use micro_route::{ResolvedRoute, RouteTable};
use std::sync::Arc;

/// A compiled route bound to its handler, guards and strategy.
pub(crate) struct BoundRoute {
    pub(crate) route: Arc<ResolvedRoute>,
    pub(crate) handler: Arc<dyn RequestHandler>,
    pub(crate) guards: GuardChain,
    pub(crate) strategy: Arc<dyn ResponseStrategy>,
}

/// The routes a dispatcher serves, in declaration order.
pub(crate) struct BoundTable {
    pub(crate) routes: Vec<BoundRoute>,
    pub(crate) default_strategy: Arc<dyn ResponseStrategy>,
    pub(crate) table: RouteTable,
}

pub(crate) enum RouteMatch<'t> {
    Found { route: &'t BoundRoute, params: PathParams },
    /// The path matched, but only under these methods.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

impl BoundTable {
    /// The first route in declaration order whose template and method match
    /// wins. HEAD falls back to the first matching GET route.
    pub(crate) fn at(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut allowed: Vec<Method> = Vec::new();
        let mut head_fallback = None;

        for bound in &self.routes {
            let Some(params) = bound.route.template().matches(path) else {
                continue;
            };
            let route_method = bound.route.method();

            if route_method == method {
                return RouteMatch::Found { route: bound, params: params.into() };
            }
            if method == Method::HEAD && route_method == Method::GET && head_fallback.is_none() {
                head_fallback = Some((bound, params));
            }
            if !allowed.contains(route_method) {
                allowed.push(route_method.clone());
            }
        }

        match head_fallback {
            Some((route, params)) => RouteMatch::Found { route, params: params.into() },
            None if allowed.is_empty() => RouteMatch::NotFound,
            None => RouteMatch::MethodNotAllowed(allowed),
        }
    }
}
