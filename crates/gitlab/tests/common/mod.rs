//! In-memory platform double for provisioning tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use quicklab_core::access::AccessLevel;
use quicklab_core::node::{Node, User, SUBTYPE_EDITION, SUBTYPE_GROUP};
use quicklab_core::project_settings::PushRules;
use quicklab_core::types::RemoteId;
use quicklab_gitlab::platform::{
    GroupSpec, MemberTarget, Platform, ProjectSource, ProjectSpec, RemoteGroup, RemoteProject,
    RemoteUser, UserSpec,
};
use quicklab_gitlab::{PlatformError, RetryPolicy};

pub const WEB_URL: &str = "https://gitlab.example.org";

#[derive(Debug, Clone)]
pub struct FakeUser {
    pub id: RemoteId,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    next_id: RemoteId,
    pub groups: HashMap<String, RemoteId>,
    group_paths: HashMap<RemoteId, String>,
    pub projects: HashMap<String, RemoteId>,
    pub users: Vec<FakeUser>,
    pub members: HashMap<(MemberTarget, RemoteId), AccessLevel>,
    pub push_rules: Vec<RemoteId>,
    pub project_sources: Vec<ProjectSource>,
    pub created_groups: Vec<String>,
    pub created_projects: Vec<String>,
    pub created_users: Vec<String>,
    pub membership_conflicts: usize,
    /// Remaining `get_group` calls that answer 502.
    pub transient_failures: u32,
    /// Remaining `get_project` calls that answer 404 whether or not the
    /// project exists.
    pub stale_project_lookups: u32,
}

impl FakeState {
    fn allocate(&mut self) -> RemoteId {
        self.next_id += 1;
        self.next_id
    }
}

/// Platform double that counts creations and records memberships.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub state: Mutex<FakeState>,
    always_unavailable: bool,
    no_push_rules: bool,
    denied: HashSet<String>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transient_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().transient_failures = count;
        self
    }

    pub fn set_stale_project_lookups(&self, count: u32) {
        self.state.lock().unwrap().stale_project_lookups = count;
    }

    pub fn always_unavailable(mut self) -> Self {
        self.always_unavailable = true;
        self
    }

    pub fn without_push_rules(mut self) -> Self {
        self.no_push_rules = true;
        self
    }

    /// Creating the group or project at `full_path` answers 403.
    pub fn deny(mut self, full_path: &str) -> Self {
        self.denied.insert(full_path.to_string());
        self
    }

    pub fn seed_user(&self, username: &str, email: &str) -> RemoteId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate();
        state.users.push(FakeUser {
            id,
            username: username.to_string(),
            email: email.to_string(),
        });
        id
    }

    pub fn group_id(&self, full_path: &str) -> Option<RemoteId> {
        self.state.lock().unwrap().groups.get(full_path).copied()
    }

    pub fn project_id(&self, full_path: &str) -> Option<RemoteId> {
        self.state.lock().unwrap().projects.get(full_path).copied()
    }

    pub fn user_id(&self, username: &str) -> Option<RemoteId> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
    }

    pub fn member_level(&self, target: MemberTarget, user: RemoteId) -> Option<AccessLevel> {
        self.state.lock().unwrap().members.get(&(target, user)).copied()
    }

    /// (groups, projects, users, memberships) created so far.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock().unwrap();
        (
            state.created_groups.len(),
            state.created_projects.len(),
            state.created_users.len(),
            state.members.len(),
        )
    }

    fn check_available(&self) -> Result<(), PlatformError> {
        if self.always_unavailable {
            return Err(PlatformError::Unavailable { status: 503 });
        }
        Ok(())
    }

    fn check_allowed(&self, full_path: &str) -> Result<(), PlatformError> {
        if self.denied.contains(full_path) {
            return Err(PlatformError::PermissionDenied {
                status: 403,
                body: format!("cannot create {full_path}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for FakePlatform {
    fn web_url(&self) -> String {
        WEB_URL.to_string()
    }

    async fn get_group(&self, full_path: &str) -> Result<RemoteGroup, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(PlatformError::Unavailable { status: 502 });
        }
        state
            .groups
            .get(full_path)
            .map(|&id| RemoteGroup {
                id,
                full_path: full_path.to_string(),
            })
            .ok_or_else(|| PlatformError::NotFound(format!("404 Group Not Found: {full_path}")))
    }

    async fn create_group(&self, spec: &GroupSpec) -> Result<RemoteGroup, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let full_path = match spec.parent_id {
            Some(parent) => {
                let parent_path = state
                    .group_paths
                    .get(&parent)
                    .cloned()
                    .ok_or_else(|| PlatformError::NotFound(format!("parent {parent}")))?;
                format!("{parent_path}/{}", spec.path)
            }
            None => spec.path.clone(),
        };
        self.check_allowed(&full_path)?;
        if state.groups.contains_key(&full_path) {
            return Err(PlatformError::Conflict(full_path));
        }
        let id = state.allocate();
        state.groups.insert(full_path.clone(), id);
        state.group_paths.insert(id, full_path.clone());
        state.created_groups.push(full_path.clone());
        Ok(RemoteGroup { id, full_path })
    }

    async fn delete_group(&self, id: RemoteId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        let path = state
            .group_paths
            .remove(&id)
            .ok_or_else(|| PlatformError::NotFound(id.to_string()))?;
        state.groups.remove(&path);
        Ok(())
    }

    async fn get_project(&self, full_path: &str) -> Result<RemoteProject, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        if state.stale_project_lookups > 0 {
            state.stale_project_lookups -= 1;
            return Err(PlatformError::NotFound(format!("404 Project Not Found: {full_path}")));
        }
        state
            .projects
            .get(full_path)
            .map(|&id| RemoteProject {
                id,
                path_with_namespace: full_path.to_string(),
            })
            .ok_or_else(|| PlatformError::NotFound(format!("404 Project Not Found: {full_path}")))
    }

    async fn create_project(&self, spec: &ProjectSpec) -> Result<RemoteProject, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        let namespace = state
            .group_paths
            .get(&spec.namespace_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("namespace {}", spec.namespace_id)))?;
        let full_path = format!("{namespace}/{}", spec.name);
        self.check_allowed(&full_path)?;
        if state.projects.contains_key(&full_path) {
            return Err(PlatformError::Conflict(full_path));
        }
        let id = state.allocate();
        state.projects.insert(full_path.clone(), id);
        state.created_projects.push(full_path.clone());
        state.project_sources.push(spec.source.clone());
        Ok(RemoteProject {
            id,
            path_with_namespace: full_path,
        })
    }

    async fn delete_project(&self, id: RemoteId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.projects.retain(|_, p| *p != id);
        Ok(())
    }

    async fn set_push_rules(
        &self,
        project: RemoteId,
        _rules: &PushRules,
    ) -> Result<(), PlatformError> {
        if self.no_push_rules {
            return Err(PlatformError::NotFound("404 Not Found".to_string()));
        }
        self.state.lock().unwrap().push_rules.push(project);
        Ok(())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<RemoteUser>, PlatformError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| RemoteUser {
                id: u.id,
                username: u.username.clone(),
            }))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<RemoteUser>, PlatformError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| RemoteUser {
                id: u.id,
                username: u.username.clone(),
            }))
    }

    async fn create_user(&self, spec: &UserSpec) -> Result<RemoteUser, PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.username == spec.username) {
            return Err(PlatformError::Conflict(spec.username.clone()));
        }
        let id = state.allocate();
        state.users.push(FakeUser {
            id,
            username: spec.username.clone(),
            email: spec.email.clone(),
        });
        state.created_users.push(spec.username.clone());
        Ok(RemoteUser {
            id,
            username: spec.username.clone(),
        })
    }

    async fn delete_user(&self, id: RemoteId) -> Result<(), PlatformError> {
        self.state.lock().unwrap().users.retain(|u| u.id != id);
        Ok(())
    }

    async fn add_member(
        &self,
        target: MemberTarget,
        user: RemoteId,
        level: AccessLevel,
    ) -> Result<(), PlatformError> {
        self.check_available()?;
        let mut state = self.state.lock().unwrap();
        if state.members.contains_key(&(target, user)) {
            state.membership_conflicts += 1;
            return Err(PlatformError::Conflict("Member already exists".to_string()));
        }
        state.members.insert((target, user), level);
        Ok(())
    }

    async fn remove_member(
        &self,
        target: MemberTarget,
        user: RemoteId,
    ) -> Result<(), PlatformError> {
        self.state.lock().unwrap().members.remove(&(target, user));
        Ok(())
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

pub fn user(username: &str, subtype: &str) -> Node {
    Node::User(User::new(
        username,
        username.to_uppercase(),
        format!("{username}@example.org"),
        subtype,
    ))
}

pub fn group(id: &str, children: Vec<Node>) -> Node {
    Node::group(id, SUBTYPE_GROUP, children)
}

pub fn course(children: Vec<Node>) -> Node {
    Node::course(
        "CS101",
        "Introduction to Programming",
        vec![Node::group("2024", SUBTYPE_EDITION, children)],
    )
}
