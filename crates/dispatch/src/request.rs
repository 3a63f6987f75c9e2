//! Per-request state handed to guards and handlers.
//!
//! - `RequestContext`: the request, the matched route, its path parameters and
//!   the caller once a guard has looked it up
//! - `PathParams`: the named segments extracted from the request path
//! - `Principal`: an authenticated caller with its permissions and groups

use crate::error::RouteError;
use crate::guard::Authenticator;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use micro_route::{AuthMethod, ResolvedRoute};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// The context of one dispatched request.
///
/// Cloning is cheap: the request and route are shared. Guards receive it
/// mutably so a caller resolved by one stage is reused by the next ones.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<Request<Bytes>>,
    path_params: Arc<PathParams>,
    route: Arc<ResolvedRoute>,
    caller: Caller,
}

#[derive(Debug, Clone)]
enum Caller {
    Unresolved,
    Anonymous,
    Principal(Arc<Principal>),
}

impl RequestContext {
    pub fn new(request: Arc<Request<Bytes>>, path_params: PathParams, route: Arc<ResolvedRoute>) -> Self {
        Self { request, path_params: Arc::new(path_params), route, caller: Caller::Unresolved }
    }

    /// Returns the underlying request
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the URI of the request, with any locale prefix already removed
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Returns the buffered request body
    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Returns the path parameters extracted from the request URL
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Shorthand for `path_params().get(name)`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns the route this request was matched to
    pub fn route(&self) -> &ResolvedRoute {
        &self.route
    }

    /// Returns the caller if an earlier stage authenticated one
    pub fn principal(&self) -> Option<&Principal> {
        match &self.caller {
            Caller::Principal(principal) => Some(principal),
            Caller::Unresolved | Caller::Anonymous => None,
        }
    }

    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.caller = match principal {
            Some(principal) => Caller::Principal(Arc::new(principal)),
            None => Caller::Anonymous,
        };
    }

    /// Looks the caller up at most once per request.
    ///
    /// The first call asks the authenticator, later calls return the cached
    /// answer whatever `method` they pass.
    pub async fn authenticate(
        &mut self,
        authenticator: &dyn Authenticator,
        method: AuthMethod,
    ) -> Result<Option<Arc<Principal>>, RouteError> {
        match &self.caller {
            Caller::Principal(principal) => return Ok(Some(Arc::clone(principal))),
            Caller::Anonymous => return Ok(None),
            Caller::Unresolved => {}
        }

        trace!(?method, "looking up caller");
        let principal = authenticator.authenticate(&self.request, method).await?.map(Arc::new);
        self.caller = match &principal {
            Some(principal) => Caller::Principal(Arc::clone(principal)),
            None => Caller::Anonymous,
        };
        Ok(principal)
    }
}

/// Named path segments extracted from the request URL.
///
/// For the template "/users/{id}" and the path "/users/7", `get("id")` returns "7".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl From<Vec<(String, String)>> for PathParams {
    fn from(params: Vec<(String, String)>) -> Self {
        Self { params }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    id: String,
    permissions: BTreeSet<String>,
    groups: BTreeSet<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// True when the caller holds every permission of at least one set.
    pub fn satisfies_any(&self, alternatives: &[Vec<String>]) -> bool {
        alternatives.iter().any(|set| set.iter().all(|permission| self.has_permission(permission)))
    }

    pub fn in_any_group(&self, groups: &[String]) -> bool {
        groups.iter().any(|group| self.groups.contains(group))
    }
}
