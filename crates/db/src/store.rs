//! The persisted course tree.
//!
//! [`TreeStore`] is the only owner of long-lived tree state. It is built
//! once from a pool and handed to whoever needs it (the replayer, the
//! provisioning endpoint, the HTTP handlers); there is no global handle.
//!
//! Groups are addressed by `(path, name)` or `(parent_group_id, name)`,
//! where `path` is the parent's full slash-joined path. Every lookup that
//! expects one group treats several matches as a corrupt store.

use futures::future::{join_all, try_join_all, BoxFuture};
use quicklab_core::error::CoreError;
use quicklab_core::node::{Node, Project, User, SUBTYPE_COURSE, SUBTYPE_EDITION};
use quicklab_core::path::TreePath;
use quicklab_core::project_settings::ProjectDefaults;
use quicklab_core::types::DbId;
use quicklab_core::roster::{head_ta_member, TaRoster};
use quicklab_core::validation::{validate_course_tree, validate_node};
use serde::Serialize;

use crate::error::StoreError;
use crate::mapping::{self, create_privilege, create_user, group_node, member_node, project_node};
use crate::models::group::{CreateGroup, DeleteRequest, DeleteTarget, GroupRow, GroupSelector};
use crate::models::repository::{CreateRepository, RepositoryRow};
use crate::models::user::UserRow;
use crate::repositories::{
    AvailableTaRepo, GroupRepo, ProjectSettingsRepo, RepositoryRepo, UserRepo,
};
use crate::DbPool;

/// Reference to an existing group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    Id(DbId),
    /// Full path of the group itself, e.g. `CS101/2024/g1`.
    Path(TreePath),
}

/// A group to insert under `parent` (`None` for a course).
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub subtype: String,
    pub description: Option<String>,
    pub parent: Option<GroupRef>,
}

/// One entry of the course catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub name: Option<String>,
    pub editions: Vec<String>,
}

/// Mail domain given to head TAs that have no stored account.
pub const DEFAULT_MAIL_DOMAIN: &str = "tudelft.nl";

#[derive(Clone)]
pub struct TreeStore {
    pool: DbPool,
    mail_domain: String,
}

impl TreeStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
        }
    }

    pub fn with_mail_domain(mut self, domain: impl Into<String>) -> Self {
        self.mail_domain = domain.into();
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Zero or one group matching the selector.
    pub async fn get_group(
        &self,
        selector: &GroupSelector,
    ) -> Result<Option<GroupRow>, StoreError> {
        let mut rows = GroupRepo::find(&self.pool, selector).await?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            n => {
                tracing::error!(selector = %selector, matches = n, "Duplicate group rows");
                Err(CoreError::CorruptStore(format!("{n} groups match '{selector}'")).into())
            }
        }
    }

    pub async fn require_group(&self, selector: &GroupSelector) -> Result<GroupRow, StoreError> {
        self.get_group(selector)
            .await?
            .ok_or_else(|| StoreError::not_found("group", selector.to_string()))
    }

    async fn resolve(&self, group: &GroupRef) -> Result<GroupRow, StoreError> {
        match group {
            GroupRef::Id(id) => self.require_group(&GroupSelector::Id(*id)).await,
            GroupRef::Path(path) => self.require_group(&GroupSelector::from_path(path)?).await,
        }
    }

    async fn edition_row(&self, course: &str, edition: &str) -> Result<(GroupRow, GroupRow), StoreError> {
        let course_row = self
            .get_group(&GroupSelector::Course {
                name: course.to_string(),
            })
            .await?
            .ok_or_else(|| StoreError::not_found("course", course))?;
        let edition_row = self
            .get_group(&GroupSelector::Child {
                parent_group_id: course_row.id,
                name: edition.to_string(),
            })
            .await?
            .ok_or_else(|| StoreError::not_found("edition", format!("{course}/{edition}")))?;
        Ok((course_row, edition_row))
    }

    // -----------------------------------------------------------------------
    // Insert
    // -----------------------------------------------------------------------

    /// Insert a single group. Fails with `AlreadyExists` when the parent
    /// already has a group of that name.
    pub async fn insert_group_if_absent(&self, input: &NewGroup) -> Result<GroupRow, StoreError> {
        let (selector, create) = match &input.parent {
            None => {
                if input.subtype != SUBTYPE_COURSE {
                    return Err(CoreError::Validation(format!(
                        "only courses can be stored without a parent, got '{}'",
                        input.subtype
                    ))
                    .into());
                }
                (
                    GroupSelector::Course {
                        name: input.name.clone(),
                    },
                    CreateGroup {
                        name: input.name.clone(),
                        path: None,
                        description: input.description.clone(),
                        parent_group_id: None,
                        subtype: input.subtype.clone(),
                    },
                )
            }
            Some(parent_ref) => {
                let parent = self.resolve(parent_ref).await?;
                if input.subtype == SUBTYPE_EDITION && parent.subtype != SUBTYPE_COURSE {
                    return Err(CoreError::Validation(format!(
                        "edition '{}' must be placed directly under a course",
                        input.name
                    ))
                    .into());
                }
                (
                    GroupSelector::Child {
                        parent_group_id: parent.id,
                        name: input.name.clone(),
                    },
                    CreateGroup {
                        name: input.name.clone(),
                        path: Some(parent.full_path()),
                        description: input.description.clone(),
                        parent_group_id: Some(parent.id),
                        subtype: input.subtype.clone(),
                    },
                )
            }
        };

        if self.get_group(&selector).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("group '{selector}'")).into());
        }

        let row = GroupRepo::create(&self.pool, &create).await?;
        tracing::debug!(group_id = row.id, path = %row.full_path(), "Inserted group");
        Ok(row)
    }

    /// Add one client node below an existing group: a group (with any
    /// children it carries), a user membership, or a repository.
    pub async fn add_node(&self, parent: &GroupRef, node: &Node) -> Result<(), StoreError> {
        validate_node(node)?;
        match node {
            Node::Group(group) => {
                let row = self
                    .insert_group_if_absent(&NewGroup {
                        name: group.id.clone(),
                        subtype: group.subtype.clone(),
                        description: group.name.clone(),
                        parent: Some(parent.clone()),
                    })
                    .await?;
                if !group.children.is_empty() {
                    self.reconcile_children(&row, node).await?;
                }
                Ok(())
            }
            Node::User(user) => self.add_user(parent, user).await.map(|_| ()),
            Node::Project(project) => self.add_repository(parent, project).await.map(|_| ()),
        }
    }

    /// Store the user if new and link it to the group.
    pub async fn add_user(&self, parent: &GroupRef, user: &User) -> Result<UserRow, StoreError> {
        let group = self.resolve(parent).await?;
        self.link_user(group.id, user).await
    }

    async fn link_user(&self, group_id: DbId, user: &User) -> Result<UserRow, StoreError> {
        let row = UserRepo::upsert(&self.pool, &create_user(user)).await?;
        UserRepo::upsert_privilege(&self.pool, &create_privilege(user, group_id, row.id)).await?;
        Ok(row)
    }

    pub async fn add_repository(
        &self,
        parent: &GroupRef,
        project: &Project,
    ) -> Result<RepositoryRow, StoreError> {
        let group = self.resolve(parent).await?;
        self.upsert_repository(group.id, project).await
    }

    async fn upsert_repository(
        &self,
        group_id: DbId,
        project: &Project,
    ) -> Result<RepositoryRow, StoreError> {
        let input = CreateRepository {
            name: project.id.clone(),
            group_id,
            repo: project.repo.clone(),
        };
        Ok(RepositoryRepo::upsert(&self.pool, &input).await?)
    }

    /// Insert or replace a whole subtree.
    ///
    /// An existing course is kept and the import descends into the incoming
    /// edition. Any other existing group keeps its row but its children are
    /// replaced by the incoming ones: stored children missing from `node`
    /// are deleted, the rest are reconciled recursively. Sibling subtrees
    /// are written concurrently and all of their failures are reported.
    pub fn add_all_groups<'a>(
        &'a self,
        node: &'a Node,
        parent_id: Option<DbId>,
    ) -> BoxFuture<'a, Result<GroupRow, StoreError>> {
        Box::pin(self.write_subtree(node, parent_id))
    }

    async fn write_subtree(
        &self,
        node: &Node,
        parent_id: Option<DbId>,
    ) -> Result<GroupRow, StoreError> {
        let Node::Group(group) = node else {
            return Err(CoreError::Validation(format!(
                "{} '{}' cannot be stored as a group",
                node.kind(),
                node.id()
            ))
            .into());
        };

        let selector = match parent_id {
            Some(parent_group_id) => GroupSelector::Child {
                parent_group_id,
                name: group.id.clone(),
            },
            None => GroupSelector::Course {
                name: group.id.clone(),
            },
        };

        match self.get_group(&selector).await? {
            Some(row) if row.subtype == SUBTYPE_COURSE => {
                if group.name.is_some() && group.name != row.description {
                    GroupRepo::update_description(&self.pool, row.id, group.name.as_deref())
                        .await?;
                }
                if let Some(edition) = node.edition() {
                    self.add_all_groups(edition, Some(row.id)).await?;
                }
                Ok(row)
            }
            Some(row) => {
                tracing::debug!(path = %row.full_path(), "Replacing children of existing group");
                self.reconcile_children(&row, node).await?;
                Ok(row)
            }
            None => {
                let row = self
                    .insert_group_if_absent(&NewGroup {
                        name: group.id.clone(),
                        subtype: group.subtype.clone(),
                        description: group.name.clone(),
                        parent: parent_id.map(GroupRef::Id),
                    })
                    .await?;
                self.reconcile_children(&row, node).await?;
                Ok(row)
            }
        }
    }

    async fn reconcile_children(&self, row: &GroupRow, node: &Node) -> Result<(), StoreError> {
        let children = node.children();

        for stored in GroupRepo::list_children(&self.pool, row.id).await? {
            let kept = children
                .iter()
                .any(|c| matches!(c, Node::Group(g) if g.id == stored.name));
            if !kept {
                GroupRepo::delete(&self.pool, stored.id).await?;
            }
        }

        for member in UserRepo::list_members(&self.pool, row.id).await? {
            let kept = children.iter().any(
                |c| matches!(c, Node::User(u) if create_user(u).gitlab_username == member.gitlab_username),
            );
            if !kept {
                UserRepo::remove_privilege(&self.pool, row.id, member.user_id).await?;
            }
        }

        for repository in RepositoryRepo::list_by_group(&self.pool, row.id).await? {
            let kept = children
                .iter()
                .any(|c| matches!(c, Node::Project(p) if p.id == repository.name));
            if !kept {
                RepositoryRepo::delete(&self.pool, repository.id).await?;
            }
        }

        let group_id = row.id;
        let writes = children.iter().map(|child| async move {
            match child {
                Node::Group(_) => self.add_all_groups(child, Some(group_id)).await.map(|_| ()),
                Node::User(user) => self.link_user(group_id, user).await.map(|_| ()),
                Node::Project(project) => {
                    self.upsert_repository(group_id, project).await.map(|_| ())
                }
            }
        });
        let failures = join_all(writes)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        StoreError::collect(failures)
    }

    /// Validate and store a full course tree.
    pub async fn import_course(&self, tree: &Node) -> Result<GroupRow, StoreError> {
        validate_course_tree(tree)?;
        let row = self.add_all_groups(tree, None).await?;
        tracing::info!(course = %row.name, "Imported course");
        Ok(row)
    }

    /// Add an empty edition to an existing course.
    pub async fn add_edition(&self, course: &str, edition: &str) -> Result<GroupRow, StoreError> {
        self.insert_group_if_absent(&NewGroup {
            name: edition.to_string(),
            subtype: SUBTYPE_EDITION.to_string(),
            description: None,
            parent: Some(GroupRef::Path(TreePath::from_segments([course]))),
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Materialize the subtree rooted at the selected group.
    pub async fn get_all_groups(&self, selector: &GroupSelector) -> Result<Node, StoreError> {
        let row = self.require_group(selector).await?;
        self.materialize(row).await
    }

    fn materialize(&self, row: GroupRow) -> BoxFuture<'_, Result<Node, StoreError>> {
        Box::pin(self.read_subtree(row))
    }

    async fn read_subtree(&self, row: GroupRow) -> Result<Node, StoreError> {
        let (subgroups, members, repositories) = futures::try_join!(
            GroupRepo::list_children(&self.pool, row.id),
            UserRepo::list_members(&self.pool, row.id),
            RepositoryRepo::list_by_group(&self.pool, row.id),
        )?;

        let mut children = try_join_all(subgroups.into_iter().map(|g| self.materialize(g))).await?;
        children.extend(repositories.into_iter().map(project_node));
        children.extend(members.into_iter().map(member_node));
        Ok(group_node(&row, children))
    }

    /// The course node with exactly one edition materialized below it.
    pub async fn load_edition(&self, course: &str, edition: &str) -> Result<Node, StoreError> {
        let (course_row, edition_row) = self.edition_row(course, edition).await?;
        let edition_node = self.materialize(edition_row).await?;
        Ok(group_node(&course_row, vec![edition_node]))
    }

    /// Every course with the names of its editions.
    pub async fn list_courses(&self) -> Result<Vec<CourseSummary>, StoreError> {
        let courses = GroupRepo::list_courses(&self.pool).await?;
        let summaries = courses.into_iter().map(|course| async move {
            let editions = GroupRepo::list_children(&self.pool, course.id).await?;
            Ok::<_, StoreError>(CourseSummary {
                id: course.name,
                name: course.description,
                editions: editions.into_iter().map(|e| e.name).collect(),
            })
        });
        try_join_all(summaries).await
    }

    // -----------------------------------------------------------------------
    // Rename
    // -----------------------------------------------------------------------

    /// Rename the group at `path`, rewriting the stored path of every
    /// descendant.
    pub async fn rename_group(&self, path: &TreePath, new_name: &str) -> Result<GroupRow, StoreError> {
        check_name(new_name)?;
        let row = self.require_group(&GroupSelector::from_path(path)?).await?;

        let sibling = match row.parent_group_id {
            Some(parent_group_id) => GroupSelector::Child {
                parent_group_id,
                name: new_name.to_string(),
            },
            None => GroupSelector::Course {
                name: new_name.to_string(),
            },
        };
        if new_name != row.name && self.get_group(&sibling).await?.is_some() {
            return Err(CoreError::AlreadyExists(format!("group '{sibling}'")).into());
        }

        let old_full = row.full_path();
        let new_full = match &row.path {
            Some(parent) => format!("{parent}/{new_name}"),
            None => new_name.to_string(),
        };
        let moved =
            GroupRepo::rename_cascading(&self.pool, row.id, &old_full, &new_full, new_name).await?;
        tracing::info!(from = %old_full, to = %new_full, descendants = moved, "Renamed group");

        self.require_group(&GroupSelector::Id(row.id)).await
    }

    /// Rename the repository at `path` (the project's own path).
    pub async fn rename_repository(
        &self,
        path: &TreePath,
        new_name: &str,
    ) -> Result<RepositoryRow, StoreError> {
        check_name(new_name)?;
        let (Some(parent), Some(old_name)) = (path.parent(), path.name()) else {
            return Err(CoreError::PathNotFound(path.to_string()).into());
        };
        let group = self.resolve(&GroupRef::Path(parent)).await?;

        if old_name != new_name
            && RepositoryRepo::find_in_group(&self.pool, group.id, new_name)
                .await?
                .is_some()
        {
            return Err(CoreError::AlreadyExists(format!("project '{new_name}'")).into());
        }
        if !RepositoryRepo::rename(&self.pool, group.id, old_name, new_name).await? {
            return Err(StoreError::not_found("project", path.to_string()));
        }
        tracing::info!(path = %path, to = new_name, "Renamed project");

        RepositoryRepo::find_in_group(&self.pool, group.id, new_name)
            .await?
            .ok_or_else(|| StoreError::not_found("project", new_name))
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete a group with its subgroups, memberships and repositories.
    pub async fn delete_group(&self, request: &DeleteRequest) -> Result<bool, StoreError> {
        let deleted = match request.target()? {
            DeleteTarget::Id(id) => GroupRepo::delete(&self.pool, id).await?,
            DeleteTarget::InPath { path, name } => {
                GroupRepo::delete_in_path(&self.pool, &path, &name).await? > 0
            }
            DeleteTarget::InParent {
                parent_group_id,
                name,
            } => GroupRepo::delete_in_parent(&self.pool, parent_group_id, &name).await? > 0,
        };
        tracing::debug!(?request, deleted, "Delete group");
        Ok(deleted)
    }

    /// By id, delete the user everywhere; by name, remove only its
    /// membership in the addressed group.
    pub async fn delete_user(&self, request: &DeleteRequest) -> Result<bool, StoreError> {
        let deleted = match request.target()? {
            DeleteTarget::Id(id) => UserRepo::delete(&self.pool, id).await?,
            DeleteTarget::InPath { path, name } => {
                let group = self.resolve(&GroupRef::Path(TreePath::parse(&path))).await?;
                UserRepo::remove_privilege_by_username(
                    &self.pool,
                    group.id,
                    mapping::normalize_user_id(&name),
                )
                .await?
            }
            DeleteTarget::InParent {
                parent_group_id,
                name,
            } => {
                UserRepo::remove_privilege_by_username(
                    &self.pool,
                    parent_group_id,
                    mapping::normalize_user_id(&name),
                )
                .await?
            }
        };
        tracing::debug!(?request, deleted, "Delete user");
        Ok(deleted)
    }

    pub async fn delete_repository(&self, request: &DeleteRequest) -> Result<bool, StoreError> {
        let deleted = match request.target()? {
            DeleteTarget::Id(id) => RepositoryRepo::delete(&self.pool, id).await?,
            DeleteTarget::InPath { path, name } => {
                let group = self.resolve(&GroupRef::Path(TreePath::parse(&path))).await?;
                RepositoryRepo::delete_in_group(&self.pool, group.id, &name).await?
            }
            DeleteTarget::InParent {
                parent_group_id,
                name,
            } => RepositoryRepo::delete_in_group(&self.pool, parent_group_id, &name).await?,
        };
        tracing::debug!(?request, deleted, "Delete project");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Project settings
    // -----------------------------------------------------------------------

    pub async fn get_project_settings(
        &self,
        course: &str,
        edition: &str,
    ) -> Result<Option<ProjectDefaults>, StoreError> {
        let (_, edition_row) = self.edition_row(course, edition).await?;
        match ProjectSettingsRepo::find(&self.pool, edition_row.id).await? {
            Some(row) => Ok(Some(ProjectDefaults::try_from(row)?)),
            None => Ok(None),
        }
    }

    pub async fn put_project_settings(
        &self,
        course: &str,
        edition: &str,
        settings: &ProjectDefaults,
    ) -> Result<ProjectDefaults, StoreError> {
        let settings = ProjectDefaults {
            push_rules: settings.push_rules.clone().normalized(),
            ..settings.clone()
        };
        settings.validate()?;
        let (_, edition_row) = self.edition_row(course, edition).await?;
        let row = ProjectSettingsRepo::upsert(&self.pool, edition_row.id, &settings).await?;
        Ok(ProjectDefaults::try_from(row)?)
    }

    // -----------------------------------------------------------------------
    // TA roster
    // -----------------------------------------------------------------------

    pub async fn get_available_tas(&self, course: &str, edition: &str) -> Result<TaRoster, StoreError> {
        let (_, edition_row) = self.edition_row(course, edition).await?;
        let rows = AvailableTaRepo::list(&self.pool, edition_row.id).await?;
        Ok(rows.into_iter().collect())
    }

    /// Replace the roster of an edition.
    ///
    /// Links missing from `roster` are dropped; a username that no longer
    /// appears in either list also loses its memberships in the edition and
    /// everything below it. Head TAs become `head_ta` members of the edition
    /// group with full rights.
    pub async fn set_available_tas(
        &self,
        course: &str,
        edition: &str,
        roster: &TaRoster,
    ) -> Result<TaRoster, StoreError> {
        let roster = roster.normalized()?;
        let (_, edition_row) = self.edition_row(course, edition).await?;
        let edition_full = edition_row.full_path();

        let mut members = Vec::with_capacity(roster.head_tas.len());
        for username in &roster.head_tas {
            let user = match UserRepo::find_by_username(&self.pool, username).await? {
                Some(row) => {
                    let mut user = head_ta_member(username, &self.mail_domain);
                    user.name = row.name;
                    user.email = row.mail_address;
                    user
                }
                None => head_ta_member(username, &self.mail_domain),
            };
            validate_node(&Node::User(user.clone()))?;
            members.push(user);
        }

        let current = AvailableTaRepo::list(&self.pool, edition_row.id).await?;
        for (kind, wanted) in roster.by_kind() {
            for row in current.iter().filter(|r| r.subtype == kind) {
                if wanted.contains(&row.gitlab_username) {
                    continue;
                }
                AvailableTaRepo::unlink(&self.pool, edition_row.id, &row.gitlab_username, kind)
                    .await?;
                if !roster.contains(&row.gitlab_username) {
                    let removed = UserRepo::remove_privileges_in_subtree(
                        &self.pool,
                        edition_row.id,
                        &edition_full,
                        &row.gitlab_username,
                    )
                    .await?;
                    tracing::debug!(
                        edition = %edition_full,
                        username = %row.gitlab_username,
                        removed,
                        "Dropped TA from edition"
                    );
                }
            }
            for username in wanted {
                AvailableTaRepo::link(&self.pool, edition_row.id, username, kind).await?;
            }
        }

        for user in &members {
            self.link_user(edition_row.id, user).await?;
        }
        tracing::info!(
            edition = %edition_full,
            tas = roster.normal_tas.len(),
            head_tas = roster.head_tas.len(),
            "Stored TA roster"
        );

        self.get_available_tas(course, edition).await
    }
}

fn check_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(CoreError::Validation(format!(
            "'{name}' is not a valid name"
        )));
    }
    Ok(())
}
