//! Depth-first provisioning of a course tree.
//!
//! Every node is looked up before it is created, so running the walk twice
//! against the same platform creates nothing the second time. A parent is
//! resolved to a remote id before any of its children start; sibling
//! subtrees run concurrently. The first failure aborts the walk and
//! nothing already created is rolled back.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use quicklab_core::access::AccessLevel;
use quicklab_core::error::CoreError;
use quicklab_core::node::{Group, Node, Project, User};
use quicklab_core::project_settings::{ImportKind, ProjectDefaults, PushRules};
use quicklab_core::types::RemoteId;

use crate::error::{PlatformError, ProvisionError};
use crate::platform::{
    GroupSpec, MemberTarget, Platform, ProjectSource, ProjectSpec, RemoteUser, UserSpec,
};
use crate::retry::RetryPolicy;

/// Name of a group or project on the platform.
pub fn remote_name(id: &str) -> String {
    id.replace(' ', "_")
}

/// Username of a user node on the platform.
pub fn remote_username(user: &User) -> String {
    let username = if user.username.is_empty() {
        &user.id
    } else {
        &user.username
    };
    username.replace(['#', '@'], "")
}

/// Settings shared by every node of one run.
struct Walk {
    source: ProjectSource,
    push_rules: PushRules,
}

pub struct Provisioner {
    platform: Arc<dyn Platform>,
    retry: RetryPolicy,
}

impl Provisioner {
    pub fn new(platform: Arc<dyn Platform>, retry: RetryPolicy) -> Self {
        Self { platform, retry }
    }

    /// Make sure every node of `tree` exists on the platform and return the
    /// web URL of its edition (or of the root when it has none).
    pub async fn provision(
        &self,
        tree: &Node,
        defaults: &ProjectDefaults,
    ) -> Result<String, ProvisionError> {
        if !matches!(tree, Node::Group(_)) {
            return Err(CoreError::Validation(format!(
                "cannot provision a tree rooted at {} '{}'",
                tree.kind(),
                tree.id()
            ))
            .into());
        }
        defaults.validate()?;

        let walk = Walk {
            source: project_source(defaults).await?,
            push_rules: defaults.push_rules.clone().normalized(),
        };

        tracing::info!(root = tree.id(), nodes = tree.node_count(), "Provisioning tree");
        self.walk(tree, None, "", &walk).await?;

        let mut path = remote_name(tree.id());
        if let Some(edition) = tree.edition() {
            path = format!("{path}/{}", remote_name(edition.id()));
        }
        let url = format!("{}/{path}", self.platform.web_url());
        tracing::info!(root = tree.id(), %url, "Provisioning finished");
        Ok(url)
    }

    fn walk<'a>(
        &'a self,
        node: &'a Node,
        parent: Option<MemberTarget>,
        path: &'a str,
        walk: &'a Walk,
    ) -> BoxFuture<'a, Result<(), ProvisionError>> {
        Box::pin(self.provision_node(node, parent, path, walk))
    }

    async fn provision_node(
        &self,
        node: &Node,
        parent: Option<MemberTarget>,
        path: &str,
        walk: &Walk,
    ) -> Result<(), ProvisionError> {
        let name = remote_name(node.id());
        let full_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{path}/{name}")
        };

        let target = match (node, parent) {
            (Node::Group(group), Some(MemberTarget::Group(parent_id))) => {
                MemberTarget::Group(self.ensure_group(group, &name, &full_path, Some(parent_id)).await?)
            }
            (Node::Group(group), None) => {
                MemberTarget::Group(self.ensure_group(group, &name, &full_path, None).await?)
            }
            (Node::Project(project), Some(MemberTarget::Group(namespace_id))) => {
                MemberTarget::Project(
                    self.ensure_project(project, &name, &full_path, namespace_id, walk)
                        .await?,
                )
            }
            (Node::User(user), Some(target)) => {
                return self.ensure_member(user, target).await;
            }
            _ => {
                return Err(CoreError::Validation(format!(
                    "{} '{full_path}' cannot be placed there",
                    node.kind()
                ))
                .into())
            }
        };

        let children = node
            .children()
            .iter()
            .map(|child| self.walk(child, Some(target), &full_path, walk));
        try_join_all(children).await?;
        Ok(())
    }

    async fn ensure_group(
        &self,
        group: &Group,
        name: &str,
        full_path: &str,
        parent_id: Option<RemoteId>,
    ) -> Result<RemoteId, ProvisionError> {
        let platform = self.platform.as_ref();
        let spec = GroupSpec {
            name: name.to_string(),
            path: name.to_string(),
            parent_id,
            description: group.name.clone().unwrap_or_default(),
        };
        let spec = &spec;

        self.retry
            .run(&format!("group {full_path}"), || async move {
                match platform.get_group(full_path).await {
                    Ok(existing) => {
                        tracing::debug!(path = full_path, id = existing.id, "Group exists");
                        Ok(existing.id)
                    }
                    Err(PlatformError::NotFound(_)) => match platform.create_group(spec).await {
                        Ok(created) => {
                            tracing::info!(path = full_path, id = created.id, "Created group");
                            Ok(created.id)
                        }
                        Err(PlatformError::Conflict(_)) => {
                            platform.get_group(full_path).await.map(|g| g.id)
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                }
            })
            .await
    }

    async fn ensure_project(
        &self,
        project: &Project,
        name: &str,
        full_path: &str,
        namespace_id: RemoteId,
        walk: &Walk,
    ) -> Result<RemoteId, ProvisionError> {
        let platform = self.platform.as_ref();
        let spec = ProjectSpec {
            name: name.to_string(),
            namespace_id,
            source: walk.source.clone(),
        };
        let spec = &spec;

        let (id, created) = self
            .retry
            .run(&format!("project {full_path}"), || async move {
                match platform.get_project(full_path).await {
                    Ok(existing) => {
                        tracing::debug!(path = full_path, id = existing.id, "Project exists");
                        Ok((existing.id, false))
                    }
                    Err(PlatformError::NotFound(_)) => match platform.create_project(spec).await {
                        Ok(created) => {
                            tracing::info!(
                                path = full_path,
                                id = created.id,
                                repo = %project.repo,
                                "Created project",
                            );
                            Ok((created.id, true))
                        }
                        Err(PlatformError::Conflict(_)) => {
                            platform.get_project(full_path).await.map(|p| (p.id, false))
                        }
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                }
            })
            .await?;

        if created {
            if let Err(e) = platform.set_push_rules(id, &walk.push_rules).await {
                tracing::warn!(path = full_path, error = %e, "Push rules not applied");
            }
        }
        Ok(id)
    }

    /// Resolve or create the account, then add it to `target`.
    async fn ensure_member(&self, user: &User, target: MemberTarget) -> Result<(), ProvisionError> {
        let platform = self.platform.as_ref();
        let spec = UserSpec {
            username: remote_username(user),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        let spec = &spec;
        let resource = format!("user {}", spec.username);

        let account = self
            .retry
            .run(&resource, || async move {
                if let Some(found) = lookup_user(platform, spec).await? {
                    return Ok(found);
                }
                match platform.create_user(spec).await {
                    Ok(created) => {
                        tracing::info!(username = %created.username, id = created.id, "Created user");
                        Ok(created)
                    }
                    Err(PlatformError::Conflict(body)) => lookup_user(platform, spec)
                        .await?
                        .ok_or(PlatformError::Conflict(body)),
                    Err(e) => Err(e),
                }
            })
            .await?;

        let account_id = account.id;
        let level = AccessLevel::for_subtype(&user.subtype);
        self.retry
            .run(&format!("membership of {}", spec.username), || async move {
                match platform.add_member(target, account_id, level).await {
                    Ok(()) => {
                        tracing::debug!(user = account_id, ?target, level = level.as_u8(), "Added member");
                        Ok(())
                    }
                    Err(PlatformError::Conflict(_)) => {
                        tracing::debug!(user = account_id, ?target, "Already a member");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            })
            .await
    }
}

async fn lookup_user(
    platform: &dyn Platform,
    spec: &UserSpec,
) -> Result<Option<RemoteUser>, PlatformError> {
    if let Some(user) = platform.find_user_by_username(&spec.username).await? {
        return Ok(Some(user));
    }
    platform.find_user_by_email(&spec.email).await
}

/// Turn the edition defaults into a project source, reading an archive
/// from disk once for the whole run.
async fn project_source(defaults: &ProjectDefaults) -> Result<ProjectSource, ProvisionError> {
    let import_url = defaults.import_url.clone().unwrap_or_default();
    match defaults.import_kind {
        ImportKind::Empty => Ok(ProjectSource::Empty),
        ImportKind::Url => Ok(ProjectSource::Url(import_url)),
        ImportKind::Archive => {
            let data = tokio::fs::read(&import_url)
                .await
                .map_err(|source| ProvisionError::Io {
                    path: import_url.clone(),
                    source,
                })?;
            let file_name = std::path::Path::new(&import_url)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project.tar.gz".to_string());
            Ok(ProjectSource::Archive {
                file_name,
                data: data.into(),
            })
        }
        ImportKind::Fork => Err(CoreError::Validation(
            "creating projects by forking is not supported".to_string(),
        )
        .into()),
    }
}
