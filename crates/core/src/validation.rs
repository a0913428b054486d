//! Structural checks on incoming trees.
//!
//! Trees arrive from the client as JSON and are checked before they reach
//! the store: every node needs a non-empty id that is usable as a path
//! segment, users need the fields the platform requires, and siblings of
//! one kind must not share an id.

use std::collections::HashSet;

use validator::Validate;

use crate::error::CoreError;
use crate::node::{Node, NodeKind, SUBTYPE_EDITION};

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Validate a single node and its subtree.
pub fn validate_node(node: &Node) -> Result<(), CoreError> {
    if node.id().trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{} id must not be empty",
            node.kind()
        )));
    }
    let id = node.id();
    if id.contains('/') || id == "." || id == ".." {
        return Err(CoreError::Validation(format!(
            "{} id '{id}' is not a valid path segment",
            node.kind()
        )));
    }
    if node.subtype().trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{} '{}' has an empty subtype",
            node.kind(),
            node.id()
        )));
    }
    if let Node::User(user) = node {
        user.validate().map_err(|e| {
            CoreError::Validation(format!("user '{}': {e}", user.id))
        })?;
    }
    if let Node::Project(project) = node {
        if project.children.iter().any(|c| c.kind() != NodeKind::User) {
            return Err(CoreError::Validation(format!(
                "project '{}' may only contain users",
                project.id
            )));
        }
    }

    let mut seen = HashSet::new();
    for child in node.children() {
        if !seen.insert((child.kind(), child.id())) {
            return Err(CoreError::Validation(format!(
                "duplicate {} '{}' under '{}'",
                child.kind(),
                child.id(),
                node.id()
            )));
        }
        validate_node(child)?;
    }
    Ok(())
}

/// Validate a full course tree: a `course` group whose first child group
/// is the `edition`.
pub fn validate_course_tree(tree: &Node) -> Result<(), CoreError> {
    if !tree.is_course() {
        return Err(CoreError::Validation(format!(
            "root '{}' is not a course (subtype '{}')",
            tree.id(),
            tree.subtype()
        )));
    }
    match tree.edition() {
        Some(edition) if edition.subtype() == SUBTYPE_EDITION => {}
        Some(other) => {
            return Err(CoreError::Validation(format!(
                "first child of course '{}' must be an {SUBTYPE_EDITION}, found '{}'",
                tree.id(),
                other.subtype()
            )))
        }
        None => {
            return Err(CoreError::Validation(format!(
                "course '{}' has no edition",
                tree.id()
            )))
        }
    }
    validate_node(tree)
}
