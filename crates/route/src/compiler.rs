//! Compiles a route tree into a flat, immutable [`RouteTable`].

use crate::config::{PathNode, RouteConfig};
use crate::error::{ConfigError, UrlError};
use crate::node_map::NodeMap;
use crate::pipeline::GuardPipeline;
use crate::requirement::{resolve_route_requirements, RequirementSet};
use crate::template::{PathTemplate, Segment, TokenRegistry};
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Strategy used when neither the tree nor the compiler names one.
pub const DEFAULT_STRATEGY: &str = "json";

/// One `(method, path)` pair with everything resolved at compile time.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    method: Method,
    template: PathTemplate,
    handler: String,
    name: Option<String>,
    strategy: String,
    requirements: RequirementSet,
    pipeline: GuardPipeline,
}

impl ResolvedRoute {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn path(&self) -> &str {
        self.template.as_str()
    }

    /// Name of the handler to invoke.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name of the response strategy for this route.
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    pub fn pipeline(&self) -> &GuardPipeline {
        &self.pipeline
    }
}

/// The compiled routes, in declaration order.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Arc<ResolvedRoute>>,
    default_strategy: String,
    basepath: String,
}

impl RouteTable {
    pub fn routes(&self) -> &[Arc<ResolvedRoute>] {
        &self.routes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResolvedRoute>> {
        self.routes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Strategy for responses that belong to no route, such as 404 and 405.
    pub fn default_strategy(&self) -> &str {
        &self.default_strategy
    }

    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&Arc<ResolvedRoute>> {
        self.routes.iter().find(|route| route.method() == method && route.path() == path)
    }

    pub fn named(&self, name: &str) -> Option<&Arc<ResolvedRoute>> {
        self.routes.iter().find(|route| route.name() == Some(name))
    }

    /// Builds the path of a named route from its parameters.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, UrlError> {
        let route = self.named(name).ok_or_else(|| UrlError::UnknownRoute(name.to_owned()))?;

        let mut url = String::new();
        for segment in route.template().segments() {
            url.push('/');
            match segment {
                Segment::Literal(literal) => url.push_str(literal),
                Segment::Param { name: param, pattern } => {
                    let value = params
                        .iter()
                        .find(|(key, _)| key == param)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| UrlError::MissingParam { route: name.to_owned(), param: param.clone() })?;
                    if pattern.as_ref().is_some_and(|pattern| !pattern.is_match(value)) || value.contains('/') {
                        return Err(UrlError::InvalidParam { param: param.clone(), value: value.to_owned() });
                    }
                    url.push_str(value);
                }
            }
        }

        if url.is_empty() {
            url.push('/');
        }
        Ok(url)
    }

    /// Prefixes `url` with the configured base path.
    pub fn real_url(&self, url: &str) -> String {
        format!("{}/{}", self.basepath.trim_end_matches('/'), url.trim_start_matches('/'))
    }
}

/// Walks a [`RouteConfig`] once and produces a [`RouteTable`].
///
/// ```
/// use micro_route::{RouteCompiler, RouteConfig};
///
/// let config = RouteConfig::from_json(r#"{
///     "paths": {"/items": {"methods": {"GET": {"handler": "items.list"}}}}
/// }"#).unwrap();
///
/// let table = RouteCompiler::new(&config).compile().unwrap();
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.routes()[0].handler(), "items.list");
/// ```
#[derive(Debug)]
pub struct RouteCompiler<'c> {
    config: &'c RouteConfig,
    default_strategy: String,
    tokens: Vec<(String, String)>,
}

impl<'c> RouteCompiler<'c> {
    pub fn new(config: &'c RouteConfig) -> Self {
        Self { config, default_strategy: DEFAULT_STRATEGY.to_owned(), tokens: vec![] }
    }

    /// Strategy for routes whose tree names none. A root `strategy` key wins over this.
    pub fn default_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.default_strategy = strategy.into();
        self
    }

    /// Registers a token in addition to the tree's `patternMatchers`.
    pub fn token(mut self, alias: impl Into<String>, regex: impl Into<String>) -> Self {
        self.tokens.push((alias.into(), regex.into()));
        self
    }

    pub fn compile(self) -> Result<RouteTable, ConfigError> {
        let config = self.config;

        let mut tokens = TokenRegistry::new();
        for (alias, regex) in config.pattern_matchers.iter() {
            tokens.register(alias, regex)?;
        }
        for (alias, regex) in &self.tokens {
            tokens.register(alias.as_str(), regex)?;
        }

        let default_strategy = config.strategy.clone().unwrap_or(self.default_strategy);

        let mut walk = Walk { config, tokens: &tokens, routes: vec![], seen: HashSet::new() };
        walk.visit(&config.paths, "", &default_strategy)?;

        debug!(routes = walk.routes.len(), "route table compiled");
        Ok(RouteTable {
            routes: walk.routes,
            default_strategy,
            basepath: config.basepath.clone().unwrap_or_else(|| "/".to_owned()),
        })
    }
}

struct Walk<'t> {
    config: &'t RouteConfig,
    tokens: &'t TokenRegistry,
    routes: Vec<Arc<ResolvedRoute>>,
    seen: HashSet<(Method, String)>,
}

impl Walk<'_> {
    fn visit(
        &mut self,
        paths: &NodeMap<PathNode>,
        prefix: &str,
        strategy: &str,
    ) -> Result<(), ConfigError> {
        for (key, node) in paths.iter() {
            let path = join_path(prefix, key);
            let strategy = node.strategy.as_deref().unwrap_or(strategy);

            if !node.methods.is_empty() {
                let template = PathTemplate::parse(&path, self.tokens)?;
                for (verb, options) in node.methods.iter() {
                    let method = parse_method(&path, verb)?;
                    let handler = options
                        .handler
                        .as_deref()
                        .map(str::trim)
                        .filter(|handler| !handler.is_empty())
                        .ok_or_else(|| ConfigError::missing_handler(&path, verb))?;

                    if !self.seen.insert((method.clone(), path.clone())) {
                        warn!(%method, %path, "route declared more than once, the first declaration wins");
                        continue;
                    }

                    let requirements = resolve_route_requirements(self.config, &method, &path, &options.requirements);
                    let pipeline = GuardPipeline::compose(&requirements, &method);
                    let route = ResolvedRoute {
                        template: template.clone(),
                        handler: handler.to_owned(),
                        name: options.name.clone(),
                        strategy: options.strategy.as_deref().unwrap_or(strategy).to_owned(),
                        requirements,
                        pipeline,
                        method,
                    };
                    self.register(route);
                }
            }

            self.visit(&node.paths, &path, strategy)?;
        }
        Ok(())
    }

    fn register(&mut self, route: ResolvedRoute) {
        debug!(
            method = %route.method,
            path = route.path(),
            handler = route.handler(),
            stages = route.pipeline.len(),
            "register route"
        );
        self.routes.push(Arc::new(route));
    }
}

fn parse_method(path: &str, verb: &str) -> Result<Method, ConfigError> {
    let upper = verb.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(ConfigError::invalid_method(path, verb));
    }
    Method::from_bytes(upper.as_bytes()).map_err(|_| ConfigError::invalid_method(path, verb))
}

/// Joins a node key onto its parent's path; only the root keeps a trailing `/`.
pub fn join_path(prefix: &str, key: &str) -> String {
    let base = prefix.trim_end_matches('/');
    let key = key.trim_matches('/');
    match (base.is_empty(), key.is_empty()) {
        (true, true) => "/".to_owned(),
        (false, true) => base.to_owned(),
        (_, false) => format!("{base}/{key}"),
    }
}
