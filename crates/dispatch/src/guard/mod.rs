//! Guards run before a route's handler and may short-circuit the request.
//!
//! A route's [`GuardPipeline`] names its stages. [`GuardChain::bind`] turns
//! each stage into a concrete [`Guard`]: the built-in access and validation
//! guards, or a custom guard registered by name. Stages run in pipeline order
//! and the first failure stops the chain.
//!
//! ## Thread Safety
//!
//! Guards and authenticators are shared by all requests of a dispatcher, so
//! both traits require `Send + Sync`.

mod access;
mod validate;

pub use access::AuthenticationGuard;
pub use access::PermissionGroupGuard;
pub use access::PermissionGuard;
pub use validate::submitted_fields;
pub use validate::ContentTypeGuard;
pub use validate::HeadersGuard;
pub use validate::RequiredFieldsGuard;

use crate::error::{BuildError, RouteError};
use crate::request::{Principal, RequestContext};
use async_trait::async_trait;
use bytes::Bytes;
use http::Request;
use micro_route::{AuthMethod, GuardStage, ResolvedRoute, StageKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One check in front of a handler.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Returns `Ok(())` to let the request continue.
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError>;
}

struct FnGuard<F>(F);

#[async_trait]
impl<F> Guard for FnGuard<F>
where
    F: Fn(&RequestContext) -> Result<(), RouteError> + Send + Sync,
{
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        (self.0)(ctx)
    }
}

/// Creates a guard from a synchronous closure.
pub fn guard_fn<F>(f: F) -> impl Guard
where
    F: Fn(&RequestContext) -> Result<(), RouteError> + Send + Sync,
{
    FnGuard(f)
}

/// Looks up the caller of a request.
///
/// `Ok(None)` means the request carries no valid credentials for `method`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &Request<Bytes>, method: AuthMethod) -> Result<Option<Principal>, RouteError>;
}

/// Treats every request as unauthenticated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl Authenticator for Anonymous {
    async fn authenticate(&self, _request: &Request<Bytes>, _method: AuthMethod) -> Result<Option<Principal>, RouteError> {
        Ok(None)
    }
}

/// The materialized guards of one route, in pipeline order.
pub struct GuardChain {
    guards: Vec<(StageKind, Arc<dyn Guard>)>,
}

impl fmt::Debug for GuardChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.guards.iter().map(|(kind, _)| kind).collect();
        f.debug_struct("GuardChain").field("stages", &kinds).finish()
    }
}

impl GuardChain {
    pub fn bind(
        route: &ResolvedRoute,
        authenticator: &Arc<dyn Authenticator>,
        custom: &HashMap<String, Arc<dyn Guard>>,
    ) -> Result<Self, BuildError> {
        let auth_method = route.requirements().auth_method;
        let mut guards: Vec<(StageKind, Arc<dyn Guard>)> = Vec::with_capacity(route.pipeline().len());

        for stage in route.pipeline() {
            let guard: Arc<dyn Guard> = match stage {
                GuardStage::Permissions(alternatives) => {
                    Arc::new(PermissionGuard::new(alternatives.clone(), auth_method, Arc::clone(authenticator)))
                }
                GuardStage::PermissionGroups(groups) => {
                    Arc::new(PermissionGroupGuard::new(groups.clone(), auth_method, Arc::clone(authenticator)))
                }
                GuardStage::Authentication(method) => {
                    Arc::new(AuthenticationGuard::new(*method, Arc::clone(authenticator)))
                }
                GuardStage::Custom(name) => match custom.get(name) {
                    Some(guard) => Arc::clone(guard),
                    None => {
                        return Err(BuildError::UnknownGuard {
                            route: format!("{} {}", route.method(), route.path()),
                            guard: name.clone(),
                        });
                    }
                },
                GuardStage::RequiredFields(fields) => Arc::new(RequiredFieldsGuard::new(fields.clone())),
                GuardStage::RequiredHeaders(headers) => Arc::new(HeadersGuard::new(headers.clone())),
                GuardStage::ContentType(mime) => Arc::new(ContentTypeGuard::new(mime.clone())),
            };
            guards.push((stage.kind(), guard));
        }

        Ok(Self { guards })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.guards.iter().map(|(kind, _)| *kind).collect()
    }

    /// Runs every guard in order, stopping at the first failure.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        for (kind, guard) in &self.guards {
            if let Err(e) = guard.check(ctx).await {
                debug!(stage = ?kind, status = %e.status_code(), "guard rejected request");
                return Err(e);
            }
        }
        Ok(())
    }
}
