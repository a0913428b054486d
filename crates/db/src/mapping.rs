//! Conversion between stored rows and client tree nodes.
//!
//! The client addresses everything by `id`; the store keeps that id as a
//! group or repository `name` and a user's `gitlab_username`. A course's
//! display name lives in the group's `description`.

use quicklab_core::node::{Group, Node, Project, Rights, User, SUBTYPE_COURSE};
use quicklab_core::types::DbId;

use crate::models::group::GroupRow;
use crate::models::repository::RepositoryRow;
use crate::models::user::{CreatePrivilege, CreateUser, MemberRow};

/// Client user ids may carry a leading `#`; the store never does.
pub fn normalize_user_id(id: &str) -> &str {
    id.trim_start_matches('#')
}

pub fn group_node(row: &GroupRow, children: Vec<Node>) -> Node {
    let name = if row.subtype == SUBTYPE_COURSE {
        row.description.clone()
    } else {
        None
    };
    let mut node = Node::group(row.name.clone(), row.subtype.clone(), children);
    if let Node::Group(Group { name: slot, .. }) = &mut node {
        *slot = name;
    }
    node
}

pub fn project_node(row: RepositoryRow) -> Node {
    Node::Project(Project::new(row.name, row.repo))
}

pub fn member_node(row: MemberRow) -> Node {
    Node::User(User {
        id: row.gitlab_username.clone(),
        subtype: row.subtype,
        name: row.name,
        username: row.gitlab_username,
        email: row.mail_address,
        rights: Rights {
            edit: row.edit,
            share: row.share,
            work: row.work,
        },
    })
}

/// The user row to insert for a user node; the username is the key.
pub fn create_user(user: &User) -> CreateUser {
    let username = if user.username.is_empty() {
        normalize_user_id(&user.id)
    } else {
        normalize_user_id(&user.username)
    };
    CreateUser {
        name: user.name.clone(),
        mail_address: user.email.clone(),
        gitlab_username: username.to_string(),
    }
}

pub fn create_privilege(user: &User, group_id: DbId, user_id: DbId) -> CreatePrivilege {
    CreatePrivilege {
        group_id,
        user_id,
        edit: user.rights.edit,
        share: user.rights.share,
        work: user.rights.work,
        subtype: user.subtype.clone(),
    }
}
