//! The declarative route tree.
//!
//! A tree is usually deserialized from configuration, e.g. in JSON:
//!
//! ```json
//! {
//!   "strategy": "json",
//!   "patternMatchers": { "id": "[0-9]+" },
//!   "paths": {
//!     "/admin": {
//!       "require_auth": true,
//!       "paths": {
//!         "/users/{user:id}": {
//!           "methods": {
//!             "GET": { "handler": "users.show", "name": "users.show" },
//!             "DELETE": { "handler": "users.delete", "require_permissions": [["users.delete"], ["admin"]] }
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Several trees, for example one per application module, can be combined
//! with [`RouteConfig::merge`].

use crate::error::ConfigError;
use crate::node_map::NodeMap;
use crate::requirement::Requirements;
use serde::{Deserialize, Serialize};

/// Root of a route tree.
///
/// Requirement keys set on the root apply to the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default, skip_serializing_if = "NodeMap::is_empty")]
    pub paths: NodeMap<PathNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Token alias to regular expression, usable as `{name:alias}` in paths.
    #[serde(default, rename = "patternMatchers", alias = "pattern_matchers", skip_serializing_if = "NodeMap::is_empty")]
    pub pattern_matchers: NodeMap<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basepath: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator: Option<TranslatorConfig>,

    #[serde(flatten)]
    pub requirements: Requirements,
}

/// Where translation resources live; their file stems are the locale codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub path: String,
}

/// One path segment (or several) of the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    #[serde(default, skip_serializing_if = "NodeMap::is_empty")]
    pub methods: NodeMap<MethodConfig>,

    #[serde(default, skip_serializing_if = "NodeMap::is_empty")]
    pub paths: NodeMap<PathNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(flatten)]
    pub requirements: Requirements,
}

/// A single verb declared on a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    #[serde(default, alias = "callable", skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    #[serde(flatten)]
    pub requirements: Requirements,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a tree from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn path(mut self, key: impl Into<String>, node: PathNode) -> Self {
        merge_paths(&mut self.paths, [(key.into(), node)]);
        self
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn pattern_matcher(mut self, alias: impl Into<String>, regex: impl Into<String>) -> Self {
        self.pattern_matchers.insert(alias, regex.into());
        self
    }

    pub fn requires(mut self, requirements: Requirements) -> Self {
        self.requirements.merge(requirements);
        self
    }

    /// Merges `other` into this tree.
    ///
    /// Nodes are matched by key. For a node present in both trees only the
    /// verbs (one by one, `other` wins) and the children (recursively) are
    /// merged; the node's own requirement keys and strategy stay ours. The
    /// same holds for the root, except that pattern matchers are unioned and
    /// `basepath` and `translator` are taken from `other` when we have none.
    pub fn merge(mut self, other: RouteConfig) -> Self {
        let RouteConfig { paths, pattern_matchers, basepath, translator, .. } = other;

        merge_paths(&mut self.paths, paths);
        for (alias, regex) in pattern_matchers {
            if self.pattern_matchers.get(&alias).is_none() {
                self.pattern_matchers.insert(alias, regex);
            }
        }
        if self.basepath.is_none() {
            self.basepath = basepath;
        }
        if self.translator.is_none() {
            self.translator = translator;
        }
        self
    }
}

impl PathNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, verb: impl Into<String>, method: MethodConfig) -> Self {
        insert_method(&mut self.methods, verb.into(), method);
        self
    }

    pub fn path(mut self, key: impl Into<String>, node: PathNode) -> Self {
        merge_paths(&mut self.paths, [(key.into(), node)]);
        self
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn requires(mut self, requirements: Requirements) -> Self {
        self.requirements.merge(requirements);
        self
    }

    /// Adds the verbs and children of `other`; everything else stays ours.
    pub fn merge(&mut self, other: PathNode) {
        let PathNode { methods, paths, .. } = other;

        for (verb, method) in methods {
            insert_method(&mut self.methods, verb, method);
        }
        merge_paths(&mut self.paths, paths);
    }
}

impl MethodConfig {
    pub fn handler(handler: impl Into<String>) -> Self {
        Self { handler: Some(handler.into()), ..Self::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn requires(mut self, requirements: Requirements) -> Self {
        self.requirements.merge(requirements);
        self
    }
}

fn merge_paths(paths: &mut NodeMap<PathNode>, other: impl IntoIterator<Item = (String, PathNode)>) {
    for (key, node) in other {
        match paths.get_mut(&key) {
            Some(existing) => existing.merge(node),
            None => {
                paths.insert(key, node);
            }
        }
    }
}

// verbs are compared case-insensitively so `get` and `GET` are the same entry
fn insert_method(methods: &mut NodeMap<MethodConfig>, verb: String, method: MethodConfig) {
    let existing = methods.keys().find(|key| key.eq_ignore_ascii_case(&verb)).map(str::to_owned);
    match existing {
        Some(key) => {
            methods.insert(key, method);
        }
        None => {
            methods.insert(verb, method);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler_of<'c>(config: &'c RouteConfig, path: &[&str], verb: &str) -> Option<&'c str> {
        let (first, rest) = path.split_first()?;
        let mut node = config.paths.get(first)?;
        for key in rest {
            node = node.paths.get(key)?;
        }
        node.methods.get(verb)?.handler.as_deref()
    }

    #[test]
    fn parse_full_tree() {
        let config = RouteConfig::from_json(
            r#"{
                "strategy": "json",
                "patternMatchers": {"id": "[0-9]+"},
                "basepath": "/app",
                "translator": {"path": "/var/lang"},
                "require_auth": false,
                "paths": {
                    "/admin": {
                        "require_auth": true,
                        "strategy": "html",
                        "paths": {
                            "/users": {"methods": {"GET": {"callable": "users.list", "name": "users"}}}
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.strategy.as_deref(), Some("json"));
        assert_eq!(config.pattern_matchers.get("id").map(String::as_str), Some("[0-9]+"));
        assert_eq!(config.translator, Some(TranslatorConfig { path: "/var/lang".into() }));
        assert_eq!(config.requirements.require_auth, Some(false));

        let admin = config.paths.get("/admin").unwrap();
        assert_eq!(admin.requirements.require_auth, Some(true));
        assert_eq!(admin.strategy.as_deref(), Some("html"));
        assert_eq!(handler_of(&config, &["/admin", "/users"], "GET"), Some("users.list"));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = RouteConfig::from_json(r#"{"paths": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn merge_later_tree_wins_per_verb() {
        let a = RouteConfig::from_value(json!({
            "paths": {"/items": {
                "methods": {"GET": {"handler": "a.list"}, "POST": {"handler": "a.create"}},
                "paths": {"/{id}": {"methods": {"GET": {"handler": "a.show"}}}}
            }}
        }))
        .unwrap();
        let b = RouteConfig::from_value(json!({
            "paths": {
                "/items": {
                    "methods": {"post": {"handler": "b.create"}},
                    "paths": {"/{id}": {"methods": {"DELETE": {"handler": "b.delete"}}}}
                },
                "/health": {"methods": {"GET": {"handler": "b.health"}}}
            }
        }))
        .unwrap();

        let merged = a.merge(b);

        assert_eq!(handler_of(&merged, &["/items"], "GET"), Some("a.list"));
        assert_eq!(handler_of(&merged, &["/items"], "POST"), Some("b.create"));
        assert_eq!(handler_of(&merged, &["/items", "/{id}"], "GET"), Some("a.show"));
        assert_eq!(handler_of(&merged, &["/items", "/{id}"], "DELETE"), Some("b.delete"));
        assert_eq!(handler_of(&merged, &["/health"], "GET"), Some("b.health"));
        assert_eq!(merged.paths.keys().collect::<Vec<_>>(), vec!["/items", "/health"]);
    }

    #[test]
    fn merge_keeps_requirements_of_shared_nodes() {
        let a = RouteConfig::new().path(
            "/admin",
            PathNode::new()
                .requires(Requirements::new().require_auth(true).required_headers(["X-A"]))
                .path("/users", PathNode::new().method("GET", MethodConfig::handler("users.list"))),
        );
        let b = RouteConfig::new()
            .path(
                "/admin",
                PathNode::new()
                    .requires(Requirements::new().require_auth(false).required_headers(["X-B"]))
                    .strategy("html")
                    .path("/health", PathNode::new().method("GET", MethodConfig::handler("health"))),
            )
            .path("/public", PathNode::new().requires(Requirements::new().required_headers(["X-P"])));

        let merged = a.merge(b);

        let admin = merged.paths.get("/admin").unwrap();
        assert_eq!(admin.requirements.require_auth, Some(true));
        assert_eq!(admin.requirements.required_headers, Some(vec!["X-A".to_owned()]));
        assert_eq!(admin.strategy, None);
        assert_eq!(handler_of(&merged, &["/admin", "/health"], "GET"), Some("health"));

        let public = merged.paths.get("/public").unwrap();
        assert_eq!(public.requirements.required_headers, Some(vec!["X-P".to_owned()]));
    }

    #[test]
    fn merge_keeps_root_settings() {
        let a = RouteConfig::new()
            .strategy("json")
            .pattern_matcher("id", "[0-9]+")
            .requires(Requirements::new().require_auth(true));
        let mut b = RouteConfig::new()
            .strategy("html")
            .pattern_matcher("id", "[a-z]+")
            .pattern_matcher("slug", "[a-z-]+")
            .requires(Requirements::new().require_auth(false));
        b.basepath = Some("/app".to_owned());

        let merged = a.merge(b);

        assert_eq!(merged.strategy.as_deref(), Some("json"));
        assert_eq!(merged.requirements.require_auth, Some(true));
        assert_eq!(merged.pattern_matchers.get("id").map(String::as_str), Some("[0-9]+"));
        assert_eq!(merged.pattern_matchers.get("slug").map(String::as_str), Some("[a-z-]+"));
        assert_eq!(merged.basepath.as_deref(), Some("/app"));
    }

    #[test]
    fn builder_matches_json() {
        let built = RouteConfig::new().path(
            "/items",
            PathNode::new()
                .method("GET", MethodConfig::handler("items.list").name("items"))
                .requires(Requirements::new().required_headers(["X-Api-Key"])),
        );
        let parsed = RouteConfig::from_value(json!({
            "paths": {"/items": {
                "required_headers": ["X-Api-Key"],
                "methods": {"GET": {"handler": "items.list", "name": "items"}}
            }}
        }))
        .unwrap();

        assert_eq!(built, parsed);
    }
}
