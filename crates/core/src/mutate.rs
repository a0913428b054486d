//! Path-addressed tree mutation.
//!
//! [`locate_and_apply`] is the single primitive every edit goes through:
//! walk from the root along the path, hand the addressed node to a
//! transform, and return the resulting tree. The input tree is never
//! modified, so a failed edit leaves the caller's tree intact.

use crate::error::CoreError;
use crate::node::{sort_siblings, Node, NodeKind};
use crate::path::TreePath;

/// Apply `transform` to the node at `path` and return the new tree.
///
/// Intermediate segments must name a container child (group first, then
/// project); otherwise [`CoreError::PathNotFound`] is returned.
pub fn locate_and_apply<F>(tree: &Node, path: &TreePath, transform: F) -> Result<Node, CoreError>
where
    F: FnOnce(&mut Node) -> Result<(), CoreError>,
{
    let mut next = tree.clone();
    let segments = path.relative_to(tree.id());
    let target = descend(&mut next, segments).ok_or_else(|| CoreError::PathNotFound(path.to_string()))?;
    transform(target)?;
    Ok(next)
}

fn descend<'a>(node: &'a mut Node, segments: &[String]) -> Option<&'a mut Node> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(node);
    };
    let children = node.children_mut()?;
    let index = children
        .iter()
        .position(|c| c.kind() == NodeKind::Group && c.id() == head)
        .or_else(|| {
            children
                .iter()
                .position(|c| c.kind() == NodeKind::Project && c.id() == head)
        })?;
    descend(&mut children[index], rest)
}

/// Find the node at `path` without modifying anything.
pub fn locate<'a>(tree: &'a Node, path: &TreePath) -> Option<&'a Node> {
    let mut current = tree;
    for segment in path.relative_to(tree.id()) {
        current = current
            .children()
            .iter()
            .filter(|c| c.kind() != NodeKind::User)
            .find(|c| c.id() == segment)?;
    }
    Some(current)
}

/// Append `child` under the container at `path`, keeping siblings sorted.
pub fn add_child(tree: &Node, path: &TreePath, child: Node) -> Result<Node, CoreError> {
    locate_and_apply(tree, path, |parent| {
        let kind = child.kind();
        let children = parent
            .children_mut()
            .ok_or_else(|| CoreError::Validation("Users cannot have children".to_string()))?;
        if children.iter().any(|c| c.kind() == kind && c.id() == child.id()) {
            return Err(CoreError::AlreadyExists(format!(
                "{kind} '{}' under '{path}'",
                child.id()
            )));
        }
        children.push(child);
        sort_siblings(children);
        Ok(())
    })
}

/// Rename the node at `path` to `new_id` and re-sort its siblings.
///
/// Refused with [`CoreError::AlreadyExists`] when a sibling of the same
/// kind already carries `new_id`.
pub fn rename(tree: &Node, path: &TreePath, new_id: &str) -> Result<Node, CoreError> {
    let below_root = path.relative_to(tree.id());
    if names_root(tree, path, below_root) {
        let mut next = tree.clone();
        next.set_id(new_id.to_string());
        return Ok(next);
    }

    let (old_id, parent_path) = match (path.name(), path.parent()) {
        (Some(name), Some(parent)) => (name.to_string(), parent),
        _ => return Err(CoreError::PathNotFound(path.to_string())),
    };

    locate_and_apply(tree, &parent_path, |parent| {
        let children = parent
            .children_mut()
            .ok_or_else(|| CoreError::PathNotFound(path.to_string()))?;
        let index = children
            .iter()
            .position(|c| c.kind() == NodeKind::Group && c.id() == old_id)
            .or_else(|| {
                children
                    .iter()
                    .position(|c| c.kind() == NodeKind::Project && c.id() == old_id)
            })
            .ok_or_else(|| CoreError::PathNotFound(path.to_string()))?;
        let kind = children[index].kind();
        if children
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.kind() == kind && c.id() == new_id)
        {
            return Err(CoreError::AlreadyExists(format!(
                "{kind} '{new_id}' next to '{old_id}'"
            )));
        }
        children[index].set_id(new_id.to_string());
        sort_siblings(children);
        Ok(())
    })
}

/// `./CS101` and a bare `CS101` (when no child shadows it) address the root.
fn names_root(tree: &Node, path: &TreePath, below_root: &[String]) -> bool {
    if path.is_root() {
        return false;
    }
    match below_root {
        [] => true,
        [only] => only == tree.id() && locate(tree, path).is_none(),
        _ => false,
    }
}

/// Remove the child `id` of kind `kind` from the container at `parent`.
pub fn delete_child(
    tree: &Node,
    parent: &TreePath,
    id: &str,
    kind: NodeKind,
) -> Result<Node, CoreError> {
    locate_and_apply(tree, parent, |node| {
        let children = node
            .children_mut()
            .ok_or_else(|| CoreError::PathNotFound(parent.to_string()))?;
        let before = children.len();
        children.retain(|c| !(c.kind() == kind && c.id() == id));
        if children.len() == before {
            return Err(CoreError::NotFound {
                entity: "node",
                key: format!("{parent}/{id}"),
            });
        }
        Ok(())
    })
}
