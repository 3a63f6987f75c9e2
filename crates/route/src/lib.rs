//! Declarative route trees for micro-http applications.
//!
//! An application describes its url space as a nested tree of path segments.
//! Each node may declare handlers per http method and requirement keys
//! (authentication, permissions, required fields and headers, content type,
//! a custom guard) that apply to everything beneath it.
//!
//! This crate turns such a tree into a flat [`RouteTable`]:
//!
//! - [`RouteConfig`] is the tree, deserializable with serde and mergeable
//!   across modules with [`RouteConfig::merge`]
//! - [`resolve_requirements`] computes the effective [`RequirementSet`] of a
//!   path, deeper levels overriding shallower ones; the compiler uses the
//!   same walk through [`resolve_route_requirements`]
//! - [`GuardPipeline::compose`] orders the guard stages a route needs
//! - [`RouteCompiler`] walks the tree once and produces the [`RouteTable`]
//!   of [`ResolvedRoute`]s that a dispatcher matches requests against

mod compiler;
mod config;
mod error;
mod node_map;
mod pipeline;
mod requirement;
mod template;

pub use compiler::join_path;
pub use compiler::ResolvedRoute;
pub use compiler::RouteCompiler;
pub use compiler::RouteTable;
pub use compiler::DEFAULT_STRATEGY;
pub use config::MethodConfig;
pub use config::PathNode;
pub use config::RouteConfig;
pub use config::TranslatorConfig;
pub use error::ConfigError;
pub use error::UrlError;
pub use node_map::NodeMap;
pub use pipeline::allowed_content_type;
pub use pipeline::is_mutating;
pub use pipeline::GuardPipeline;
pub use pipeline::GuardStage;
pub use pipeline::StageKind;
pub use pipeline::ALLOWED_CONTENT_TYPES;
pub use requirement::resolve_requirements;
pub use requirement::resolve_route_requirements;
pub use requirement::AuthMethod;
pub use requirement::PermissionSpec;
pub use requirement::RequirementSet;
pub use requirement::Requirements;
pub use template::PathTemplate;
pub use template::Segment;
pub use template::TokenPattern;
pub use template::TokenRegistry;
pub use template::BUILTIN_TOKENS;
