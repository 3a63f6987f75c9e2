use super::{Authenticator, Guard};
use crate::error::RouteError;
use crate::request::RequestContext;
use async_trait::async_trait;
use micro_route::AuthMethod;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Requires a caller holding every permission of at least one set.
pub struct PermissionGuard {
    alternatives: Vec<Vec<String>>,
    method: AuthMethod,
    authenticator: Arc<dyn Authenticator>,
}

impl PermissionGuard {
    pub fn new(alternatives: Vec<Vec<String>>, method: AuthMethod, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { alternatives, method, authenticator }
    }
}

impl fmt::Debug for PermissionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGuard").field("alternatives", &self.alternatives).field("method", &self.method).finish()
    }
}

#[async_trait]
impl Guard for PermissionGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        let principal = ctx.authenticate(self.authenticator.as_ref(), self.method).await?.ok_or(RouteError::Unauthenticated)?;

        if principal.satisfies_any(&self.alternatives) {
            Ok(())
        } else {
            debug!(principal = principal.id(), required = ?self.alternatives, "missing permissions");
            Err(RouteError::Forbidden)
        }
    }
}

/// Requires a caller belonging to any of the listed groups.
pub struct PermissionGroupGuard {
    groups: Vec<String>,
    method: AuthMethod,
    authenticator: Arc<dyn Authenticator>,
}

impl PermissionGroupGuard {
    pub fn new(groups: Vec<String>, method: AuthMethod, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { groups, method, authenticator }
    }
}

impl fmt::Debug for PermissionGroupGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGroupGuard").field("groups", &self.groups).field("method", &self.method).finish()
    }
}

#[async_trait]
impl Guard for PermissionGroupGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        let principal = ctx.authenticate(self.authenticator.as_ref(), self.method).await?.ok_or(RouteError::Unauthenticated)?;

        if principal.in_any_group(&self.groups) {
            Ok(())
        } else {
            debug!(principal = principal.id(), required = ?self.groups, "not in a required group");
            Err(RouteError::Forbidden)
        }
    }
}

/// Requires any authenticated caller.
pub struct AuthenticationGuard {
    method: AuthMethod,
    authenticator: Arc<dyn Authenticator>,
}

impl AuthenticationGuard {
    pub fn new(method: AuthMethod, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { method, authenticator }
    }
}

impl fmt::Debug for AuthenticationGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationGuard").field("method", &self.method).finish()
    }
}

#[async_trait]
impl Guard for AuthenticationGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        match ctx.authenticate(self.authenticator.as_ref(), self.method).await? {
            Some(_) => Ok(()),
            None => Err(RouteError::Unauthenticated),
        }
    }
}
