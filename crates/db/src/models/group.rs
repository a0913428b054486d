//! Group rows and the ways of addressing them.

use std::fmt;

use quicklab_core::error::CoreError;
use quicklab_core::path::TreePath;
use quicklab_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupRow {
    pub id: DbId,
    pub name: String,
    /// Full path of the parent; `None` for courses.
    pub path: Option<String>,
    /// Display name of a course.
    pub description: Option<String>,
    pub parent_group_id: Option<DbId>,
    pub subtype: String,
    pub created_at: Timestamp,
}

impl GroupRow {
    /// `path/name`, or just `name` at the root.
    pub fn full_path(&self) -> String {
        match &self.path {
            Some(path) => format!("{path}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// DTO for inserting a group. `path` and `parent_group_id` are resolved
/// by the store before this reaches the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroup {
    pub name: String,
    pub path: Option<String>,
    pub description: Option<String>,
    pub parent_group_id: Option<DbId>,
    pub subtype: String,
}

/// Lookup forms for a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    Id(DbId),
    Child { parent_group_id: DbId, name: String },
    /// `path` is the parent's full path.
    Path { path: String, name: String },
    /// A root group (no parent) with this name.
    Course { name: String },
}

impl GroupSelector {
    /// Selector for the group addressed by a full tree path.
    pub fn from_path(path: &TreePath) -> Result<Self, CoreError> {
        match path.split_last() {
            Some((Some(parent), name)) => Ok(GroupSelector::Path {
                path: parent,
                name: name.to_string(),
            }),
            Some((None, name)) => Ok(GroupSelector::Course {
                name: name.to_string(),
            }),
            None => Err(CoreError::PathNotFound(path.to_string())),
        }
    }
}

impl fmt::Display for GroupSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSelector::Id(id) => write!(f, "#{id}"),
            GroupSelector::Child {
                parent_group_id,
                name,
            } => write!(f, "{name} (parent #{parent_group_id})"),
            GroupSelector::Path { path, name } => write!(f, "{path}/{name}"),
            GroupSelector::Course { name } => f.write_str(name),
        }
    }
}

/// Addressing for a delete. The first complete form wins: `id`, then
/// `name` + `path`, then `name` + `parent_group_id`.
///
/// `path` is always the full path of the containing group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    pub id: Option<DbId>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub parent_group_id: Option<DbId>,
}

/// A resolved [`DeleteRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Id(DbId),
    InPath { path: String, name: String },
    InParent { parent_group_id: DbId, name: String },
}

impl DeleteRequest {
    pub fn by_name_in_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn target(&self) -> Result<DeleteTarget, CoreError> {
        if let Some(id) = self.id {
            return Ok(DeleteTarget::Id(id));
        }
        match (&self.name, &self.path, self.parent_group_id) {
            (Some(name), Some(path), _) => Ok(DeleteTarget::InPath {
                path: TreePath::parse(path).to_string(),
                name: name.clone(),
            }),
            (Some(name), None, Some(parent_group_id)) => Ok(DeleteTarget::InParent {
                parent_group_id,
                name: name.clone(),
            }),
            _ => Err(CoreError::InsufficientSelector(
                "one of id, name + path, or name + parent_group_id is required",
            )),
        }
    }
}
