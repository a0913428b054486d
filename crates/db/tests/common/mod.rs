//! Shared tree builders for store tests.

#![allow(dead_code)]

use quicklab_core::node::{Node, Project, User, DEFAULT_REPO, SUBTYPE_EDITION, SUBTYPE_GROUP};

pub fn user(username: &str, name: &str, subtype: &str) -> Node {
    Node::User(User::new(
        username,
        name,
        format!("{username}@example.org"),
        subtype,
    ))
}

pub fn group(id: &str, children: Vec<Node>) -> Node {
    Node::group(id, SUBTYPE_GROUP, children)
}

pub fn project(id: &str) -> Node {
    Node::Project(Project::new(id, DEFAULT_REPO))
}

/// `CS101` / `2024` with the given edition children.
pub fn course(children: Vec<Node>) -> Node {
    Node::course(
        "CS101",
        "Introduction to Programming",
        vec![Node::group("2024", SUBTYPE_EDITION, children)],
    )
}

/// Ids of the children of `node`, in order.
pub fn child_ids(node: &Node) -> Vec<String> {
    node.children().iter().map(|c| c.id().to_string()).collect()
}
