//! Requirement keys and their root-to-leaf resolution.
//!
//! Every node of the route tree may carry requirement keys. A route's
//! effective [`RequirementSet`] is built by starting from the defaults and
//! overlaying, in order: the tree-wide keys on the config root, each node on
//! the way down to the route, and finally the keys set on the method itself.
//! A deeper value always replaces a shallower one.

use crate::config::{PathNode, RouteConfig};
use crate::node_map::NodeMap;
use crate::template::split_segments;
use http::Method;
use serde::{Deserialize, Deserializer, Serialize};

/// How the authentication stage identifies the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Session,
    Token,
    Basic,
}

/// `require_permissions` as written in configuration.
///
/// A flat list is one permission set; a list of lists holds alternative sets,
/// any one of which is sufficient. Within a set every permission is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionSpec {
    Alternatives(Vec<Vec<String>>),
    All(Vec<String>),
}

impl PermissionSpec {
    /// Normalizes to a list of alternative sets, dropping empty sets.
    pub fn alternatives(&self) -> Vec<Vec<String>> {
        match self {
            PermissionSpec::All(all) if all.is_empty() => vec![],
            PermissionSpec::All(all) => vec![all.clone()],
            PermissionSpec::Alternatives(sets) => sets.iter().filter(|set| !set.is_empty()).cloned().collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|value| match value {
        OneOrMany::One(one) => vec![one],
        OneOrMany::Many(many) => many,
    }))
}

/// Requirement keys as declared on one level of the tree. Unset keys inherit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub required_fields: Option<Vec<String>>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub required_headers: Option<Vec<String>>,

    #[serde(
        default,
        rename = "required_ContentType",
        alias = "required_content_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_auth: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_permissions: Option<PermissionSpec>,

    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub required_permission_groups: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middleware: Option<String>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.required_content_type = Some(content_type.into());
        self
    }

    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = Some(require_auth);
        self
    }

    pub fn auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = Some(auth_method);
        self
    }

    pub fn require_permissions(mut self, permissions: PermissionSpec) -> Self {
        self.require_permissions = Some(permissions);
        self
    }

    pub fn required_permission_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permission_groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    pub fn middleware(mut self, middleware: impl Into<String>) -> Self {
        self.middleware = Some(middleware.into());
        self
    }

    /// Returns true if no key is set at this level.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Takes every key set on `other`, keeping ours where `other` is silent.
    pub fn merge(&mut self, other: Requirements) {
        let Requirements {
            required_fields,
            required_headers,
            required_content_type,
            require_auth,
            auth_method,
            require_permissions,
            required_permission_groups,
            middleware,
        } = other;

        if required_fields.is_some() {
            self.required_fields = required_fields;
        }
        if required_headers.is_some() {
            self.required_headers = required_headers;
        }
        if required_content_type.is_some() {
            self.required_content_type = required_content_type;
        }
        if require_auth.is_some() {
            self.require_auth = require_auth;
        }
        if auth_method.is_some() {
            self.auth_method = auth_method;
        }
        if require_permissions.is_some() {
            self.require_permissions = require_permissions;
        }
        if required_permission_groups.is_some() {
            self.required_permission_groups = required_permission_groups;
        }
        if middleware.is_some() {
            self.middleware = middleware;
        }
    }
}

/// The fully resolved requirements of one route. Every key has a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    pub required_fields: Vec<String>,
    pub required_headers: Vec<String>,
    pub required_content_type: Option<String>,
    pub require_auth: bool,
    pub auth_method: AuthMethod,
    /// Alternative permission sets; empty means no permission check.
    pub require_permissions: Vec<Vec<String>>,
    pub required_permission_groups: Vec<String>,
    pub middleware: Option<String>,
}

impl RequirementSet {
    /// Overlays every key present in `requirements` onto this set.
    pub fn overlay(&mut self, requirements: &Requirements) {
        if let Some(fields) = &requirements.required_fields {
            self.required_fields = unique(fields);
        }
        if let Some(headers) = &requirements.required_headers {
            self.required_headers = unique(headers);
        }
        if let Some(content_type) = &requirements.required_content_type {
            let content_type = content_type.trim();
            self.required_content_type = (!content_type.is_empty()).then(|| content_type.to_owned());
        }
        if let Some(require_auth) = requirements.require_auth {
            self.require_auth = require_auth;
        }
        if let Some(auth_method) = requirements.auth_method {
            self.auth_method = auth_method;
        }
        if let Some(permissions) = &requirements.require_permissions {
            self.require_permissions = permissions.alternatives();
        }
        if let Some(groups) = &requirements.required_permission_groups {
            self.required_permission_groups = unique(groups);
        }
        if let Some(middleware) = &requirements.middleware {
            let middleware = middleware.trim();
            self.middleware = (!middleware.is_empty()).then(|| middleware.to_owned());
        }
    }

    pub fn overlaid(&self, requirements: &Requirements) -> Self {
        let mut set = self.clone();
        set.overlay(requirements);
        set
    }
}

fn unique(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !value.is_empty() && !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

/// Resolves the effective requirements for the route at `path`.
///
/// `path` is a route template as it appears in the compiled table, e.g.
/// `/admin/users/{id}`. The nodes overlaid are the first chain, in
/// declaration order, whose keys spell out `path` segment by segment; a `/`
/// key consumes no segment. The walk stops once the path is consumed, so
/// children of the last node never contribute. When no chain spells out the
/// whole path, the deepest partial chain is used and the missing levels
/// simply contribute nothing.
pub fn resolve_requirements(config: &RouteConfig, path: &str, overrides: &Requirements) -> RequirementSet {
    resolve(config, None, path, overrides)
}

/// Like [`resolve_requirements`], but the chain must end at a node declaring
/// `method`.
///
/// A node and its `/` child share a path; the verb tells them apart. This is
/// what the compiler uses for every route it registers.
pub fn resolve_route_requirements(
    config: &RouteConfig,
    method: &Method,
    path: &str,
    overrides: &Requirements,
) -> RequirementSet {
    resolve(config, Some(method), path, overrides)
}

fn resolve(config: &RouteConfig, method: Option<&Method>, path: &str, overrides: &Requirements) -> RequirementSet {
    let mut set = RequirementSet::default();
    set.overlay(&config.requirements);

    let segments = split_segments(path);
    let mut search = ChainSearch { segments: &segments, method, best: vec![], best_consumed: 0 };
    let mut chain = vec![];
    let nodes = if search.visit(&config.paths, 0, &mut chain) { chain } else { search.best };

    for node in nodes {
        set.overlay(&node.requirements);
    }
    set.overlay(overrides);
    set
}

struct ChainSearch<'s, 't> {
    segments: &'s [&'s str],
    method: Option<&'s Method>,
    best: Vec<&'t PathNode>,
    best_consumed: usize,
}

impl<'t> ChainSearch<'_, 't> {
    /// Depth first, in declaration order. Returns true once `chain` spells out
    /// the whole path and its last node declares the method.
    fn visit(&mut self, level: &'t NodeMap<PathNode>, consumed: usize, chain: &mut Vec<&'t PathNode>) -> bool {
        for (key, node) in level.iter() {
            let key_segments = split_segments(key);
            if !self.segments[consumed..].starts_with(&key_segments) {
                continue;
            }
            let consumed = consumed + key_segments.len();
            chain.push(node);

            if consumed == self.segments.len() && self.declares(node) {
                return true;
            }
            if consumed > self.best_consumed || self.best.is_empty() {
                self.best.clone_from(chain);
                self.best_consumed = consumed;
            }
            if self.visit(&node.paths, consumed, chain) {
                return true;
            }
            chain.pop();
        }
        false
    }

    fn declares(&self, node: &PathNode) -> bool {
        match self.method {
            None => true,
            Some(method) => node.methods.keys().any(|verb| verb.trim().eq_ignore_ascii_case(method.as_str())),
        }
    }
}
