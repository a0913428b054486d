//! Course tree node model and canonical sibling ordering.
//!
//! A course tree is a [`Node::Group`] with subtype `course` whose first
//! child is the `edition` group. Groups nest arbitrarily; projects and
//! users are leaves (projects may carry users in rare cases).
//!
//! The JSON shape matches what the browser client sends and receives:
//! `{ "id", "type": "group" | "project" | "user", "subtype", ... }`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

pub const SUBTYPE_COURSE: &str = "course";
pub const SUBTYPE_EDITION: &str = "edition";
pub const SUBTYPE_GROUP: &str = "group";
pub const SUBTYPE_PROJECT: &str = "project";
pub const SUBTYPE_STUDENT: &str = "student";
pub const SUBTYPE_TA: &str = "ta";
pub const SUBTYPE_HEAD_TA: &str = "head_ta";
pub const SUBTYPE_OWNER: &str = "owner";

/// Repo descriptor used when a project does not name one.
pub const DEFAULT_REPO: &str = "default";

/// The three node variants, ordered the way siblings are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group,
    Project,
    User,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::Project => "project",
            NodeKind::User => "user",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(NodeKind::Group),
            "project" => Ok(NodeKind::Project),
            "user" => Ok(NodeKind::User),
            other => Err(CoreError::Validation(format!("Unknown node type '{other}'"))),
        }
    }
}

/// Per-user flags carried along with a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rights {
    pub edit: bool,
    pub share: bool,
    pub work: bool,
}

impl Default for Rights {
    fn default() -> Self {
        Self {
            edit: false,
            share: false,
            work: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default = "default_group_subtype")]
    pub subtype: String,
    /// Display name; only courses carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default = "default_project_subtype")]
    pub subtype: String,
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default = "default_user_subtype")]
    pub subtype: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub rights: Rights,
}

fn default_group_subtype() -> String {
    SUBTYPE_GROUP.to_string()
}

fn default_project_subtype() -> String {
    SUBTYPE_PROJECT.to_string()
}

fn default_user_subtype() -> String {
    SUBTYPE_STUDENT.to_string()
}

fn default_repo() -> String {
    DEFAULT_REPO.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Group(Group),
    Project(Project),
    User(User),
}

impl Group {
    pub fn new(id: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subtype: subtype.into(),
            name: None,
            children: Vec::new(),
        }
    }
}

impl Project {
    pub fn new(id: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subtype: default_project_subtype(),
            repo: repo.into(),
            children: Vec::new(),
        }
    }
}

impl User {
    /// A user whose node id is its username, as the client builds them.
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        subtype: impl Into<String>,
    ) -> Self {
        let username = username.into();
        Self {
            id: username.clone(),
            subtype: subtype.into(),
            name: name.into(),
            username,
            email: email.into(),
            rights: Rights::default(),
        }
    }
}

impl Node {
    /// Build a group node with the given children, sorted canonically.
    pub fn group(id: impl Into<String>, subtype: impl Into<String>, children: Vec<Node>) -> Self {
        let mut group = Group::new(id, subtype);
        group.children = children;
        sort_siblings(&mut group.children);
        Node::Group(group)
    }

    /// Build a course root with a display name and its editions.
    pub fn course(id: impl Into<String>, name: impl Into<String>, editions: Vec<Node>) -> Self {
        let mut node = Node::group(id, SUBTYPE_COURSE, editions);
        if let Node::Group(group) = &mut node {
            group.name = Some(name.into());
        }
        node
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Group(_) => NodeKind::Group,
            Node::Project(_) => NodeKind::Project,
            Node::User(_) => NodeKind::User,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Group(g) => &g.id,
            Node::Project(p) => &p.id,
            Node::User(u) => &u.id,
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            Node::Group(g) => g.id = id,
            Node::Project(p) => p.id = id,
            Node::User(u) => u.id = id,
        }
    }

    pub fn subtype(&self) -> &str {
        match self {
            Node::Group(g) => &g.subtype,
            Node::Project(p) => &p.subtype,
            Node::User(u) => &u.subtype,
        }
    }

    pub fn is_course(&self) -> bool {
        matches!(self, Node::Group(g) if g.subtype == SUBTYPE_COURSE)
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Group(g) => &g.children,
            Node::Project(p) => &p.children,
            Node::User(_) => &[],
        }
    }

    /// Mutable access to the child list; `None` for users, which are leaves.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Group(g) => Some(&mut g.children),
            Node::Project(p) => Some(&mut p.children),
            Node::User(_) => None,
        }
    }

    /// The string siblings of the same kind are ordered by.
    pub fn sort_key(&self) -> &str {
        match self {
            Node::User(u) => &u.name,
            other => other.id(),
        }
    }

    /// The edition child of a course (its first child group), if any.
    pub fn edition(&self) -> Option<&Node> {
        self.children()
            .iter()
            .find(|child| child.kind() == NodeKind::Group)
    }

    /// Re-sort every child list in this subtree.
    pub fn sort_recursive(&mut self) {
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                child.sort_recursive();
            }
            sort_siblings(children);
        }
    }

    /// Count nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }
}

/// Canonical sibling order: groups, then projects, then users; within a
/// kind, case-insensitive by key with the exact key as tiebreaker.
pub fn canonical_order(a: &Node, b: &Node) -> Ordering {
    a.kind().cmp(&b.kind()).then_with(|| {
        let (ka, kb) = (a.sort_key(), b.sort_key());
        ka.to_lowercase()
            .cmp(&kb.to_lowercase())
            .then_with(|| ka.cmp(kb))
    })
}

pub fn sort_siblings(children: &mut [Node]) {
    children.sort_by(canonical_order);
}

/// Returns `true` when every child list in the subtree is canonically ordered.
pub fn is_canonically_sorted(node: &Node) -> bool {
    let children = node.children();
    children
        .windows(2)
        .all(|pair| canonical_order(&pair[0], &pair[1]) != Ordering::Greater)
        && children.iter().all(is_canonically_sorted)
}
