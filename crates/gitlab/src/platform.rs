//! The hosting-platform seam.
//!
//! Every call is a single request with no retry; the provisioner decides
//! what to retry. Lookups return [`PlatformError::NotFound`] for absent
//! groups and projects, and `Ok(None)` for user searches with no hit.

use std::sync::Arc;

use async_trait::async_trait;
use quicklab_core::access::AccessLevel;
use quicklab_core::project_settings::PushRules;
use quicklab_core::types::RemoteId;
use serde::Deserialize;

use crate::error::PlatformError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteGroup {
    pub id: RemoteId,
    #[serde(default)]
    pub full_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProject {
    pub id: RemoteId,
    #[serde(default)]
    pub path_with_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: RemoteId,
    pub username: String,
}

/// A group to create. `path` is the URL slug, equal to `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub path: String,
    pub parent_id: Option<RemoteId>,
    pub description: String,
}

/// How a new project is seeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    Empty,
    Url(String),
    /// Exported project archive, read once per provisioning run.
    Archive {
        file_name: String,
        data: Arc<[u8]>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    pub name: String,
    pub namespace_id: RemoteId,
    pub source: ProjectSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    pub name: String,
    pub email: String,
}

/// Resource a user is made a member of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberTarget {
    Group(RemoteId),
    Project(RemoteId),
}

impl MemberTarget {
    pub fn id(self) -> RemoteId {
        match self {
            MemberTarget::Group(id) | MemberTarget::Project(id) => id,
        }
    }
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Web root used to build result URLs, e.g. `https://gitlab.com`.
    fn web_url(&self) -> String;

    async fn get_group(&self, full_path: &str) -> Result<RemoteGroup, PlatformError>;
    async fn create_group(&self, spec: &GroupSpec) -> Result<RemoteGroup, PlatformError>;
    async fn delete_group(&self, id: RemoteId) -> Result<(), PlatformError>;

    async fn get_project(&self, full_path: &str) -> Result<RemoteProject, PlatformError>;
    async fn create_project(&self, spec: &ProjectSpec) -> Result<RemoteProject, PlatformError>;
    async fn delete_project(&self, id: RemoteId) -> Result<(), PlatformError>;
    async fn set_push_rules(&self, project: RemoteId, rules: &PushRules)
        -> Result<(), PlatformError>;

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteUser>, PlatformError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<RemoteUser>, PlatformError>;
    async fn create_user(&self, spec: &UserSpec) -> Result<RemoteUser, PlatformError>;
    async fn delete_user(&self, id: RemoteId) -> Result<(), PlatformError>;

    async fn add_member(
        &self,
        target: MemberTarget,
        user: RemoteId,
        level: AccessLevel,
    ) -> Result<(), PlatformError>;
    async fn remove_member(&self, target: MemberTarget, user: RemoteId)
        -> Result<(), PlatformError>;
}
