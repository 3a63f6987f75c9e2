//! Guard pipeline composition.
//!
//! A route's [`RequirementSet`] is turned into an ordered list of guard stage
//! descriptors. The order is fixed by [`StageKind::ORDER`]: who may call the
//! route is settled before what they sent is validated. A stage only appears
//! when its requirement is set.

use crate::requirement::{AuthMethod, RequirementSet};
use http::Method;
use mime::Mime;

/// Content types a mutating route may require.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["application/x-www-form-urlencoded", "application/json", "application/xml"];

/// Methods for which the content type stage can be active.
#[inline]
pub fn is_mutating(method: &Method) -> bool {
    matches!(method, &Method::POST | &Method::PUT | &Method::PATCH | &Method::DELETE)
}

/// Returns the declared content type if it names one of [`ALLOWED_CONTENT_TYPES`].
pub fn allowed_content_type(declared: &str) -> Option<Mime> {
    let mime = declared.parse::<Mime>().ok()?;
    ALLOWED_CONTENT_TYPES.contains(&mime.essence_str()).then_some(mime)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Permissions,
    PermissionGroups,
    Authentication,
    Custom,
    RequiredFields,
    RequiredHeaders,
    ContentType,
}

impl StageKind {
    pub const ORDER: [StageKind; 7] = [
        StageKind::Permissions,
        StageKind::PermissionGroups,
        StageKind::Authentication,
        StageKind::Custom,
        StageKind::RequiredFields,
        StageKind::RequiredHeaders,
        StageKind::ContentType,
    ];

    fn select(self, requirements: &RequirementSet, method: &Method) -> Option<GuardStage> {
        match self {
            StageKind::Permissions => (!requirements.require_permissions.is_empty())
                .then(|| GuardStage::Permissions(requirements.require_permissions.clone())),
            StageKind::PermissionGroups => (!requirements.required_permission_groups.is_empty())
                .then(|| GuardStage::PermissionGroups(requirements.required_permission_groups.clone())),
            StageKind::Authentication => {
                requirements.require_auth.then_some(GuardStage::Authentication(requirements.auth_method))
            }
            StageKind::Custom => requirements.middleware.clone().map(GuardStage::Custom),
            StageKind::RequiredFields => (!requirements.required_fields.is_empty())
                .then(|| GuardStage::RequiredFields(requirements.required_fields.clone())),
            StageKind::RequiredHeaders => (!requirements.required_headers.is_empty())
                .then(|| GuardStage::RequiredHeaders(requirements.required_headers.clone())),
            StageKind::ContentType => {
                if !is_mutating(method) {
                    return None;
                }
                let declared = requirements.required_content_type.as_deref()?;
                allowed_content_type(declared).map(GuardStage::ContentType)
            }
        }
    }
}

/// One step of a guard pipeline, carrying the requirement value it checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardStage {
    /// Alternative permission sets; the caller must hold every permission of one set.
    Permissions(Vec<Vec<String>>),
    /// The caller must belong to one of these groups.
    PermissionGroups(Vec<String>),
    Authentication(AuthMethod),
    /// A guard registered under this name.
    Custom(String),
    RequiredFields(Vec<String>),
    RequiredHeaders(Vec<String>),
    ContentType(Mime),
}

impl GuardStage {
    pub fn kind(&self) -> StageKind {
        match self {
            GuardStage::Permissions(_) => StageKind::Permissions,
            GuardStage::PermissionGroups(_) => StageKind::PermissionGroups,
            GuardStage::Authentication(_) => StageKind::Authentication,
            GuardStage::Custom(_) => StageKind::Custom,
            GuardStage::RequiredFields(_) => StageKind::RequiredFields,
            GuardStage::RequiredHeaders(_) => StageKind::RequiredHeaders,
            GuardStage::ContentType(_) => StageKind::ContentType,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardPipeline {
    stages: Vec<GuardStage>,
}

impl GuardPipeline {
    pub fn compose(requirements: &RequirementSet, method: &Method) -> Self {
        let stages = StageKind::ORDER.iter().filter_map(|kind| kind.select(requirements, method)).collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[GuardStage] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(GuardStage::kind).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<'a> IntoIterator for &'a GuardPipeline {
    type Item = &'a GuardStage;
    type IntoIter = std::slice::Iter<'a, GuardStage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}
