//! Client edit transactions.
//!
//! The client records every edit as `{ "type": "ADD" | "RENAME" | "DELETE" |
//! "SNAPSHOT", "payload": ... }`. Entries arrive as [`RawTransaction`] and
//! are only interpreted when they are about to be applied, so an unknown
//! type further down a log does not prevent earlier entries from running.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::mutate;
use crate::node::{Node, NodeKind};
use crate::path::TreePath;

pub const TX_ADD: &str = "ADD";
pub const TX_RENAME: &str = "RENAME";
pub const TX_DELETE: &str = "DELETE";
pub const TX_SNAPSHOT: &str = "SNAPSHOT";
/// Older clients send full-tree imports under this name.
pub const TX_GROUP_DATA: &str = "GROUP_DATA";

/// A log entry as received, before its type is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPayload {
    /// Path of the container the node is added to.
    pub path: String,
    pub data: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamePayload {
    /// Path of the renamed node, including its current id.
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePayload {
    /// Path of the container the node is removed from.
    pub parent: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transaction {
    Add(AddPayload),
    Rename(RenamePayload),
    Delete(DeletePayload),
    /// Full course tree replacing the stored edition.
    Snapshot(Node),
}

impl Transaction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Transaction::Add(_) => TX_ADD,
            Transaction::Rename(_) => TX_RENAME,
            Transaction::Delete(_) => TX_DELETE,
            Transaction::Snapshot(_) => TX_SNAPSHOT,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(kind: &str, value: &Value) -> Result<T, CoreError> {
    T::deserialize(value)
        .map_err(|e| CoreError::Validation(format!("Malformed {kind} payload: {e}")))
}

impl TryFrom<&RawTransaction> for Transaction {
    type Error = CoreError;

    fn try_from(raw: &RawTransaction) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            TX_ADD => Ok(Transaction::Add(payload(TX_ADD, &raw.payload)?)),
            TX_RENAME => Ok(Transaction::Rename(payload(TX_RENAME, &raw.payload)?)),
            TX_DELETE => Ok(Transaction::Delete(payload(TX_DELETE, &raw.payload)?)),
            TX_SNAPSHOT | TX_GROUP_DATA => {
                Ok(Transaction::Snapshot(payload(TX_SNAPSHOT, &raw.payload)?))
            }
            other => Err(CoreError::UnknownTransaction(other.to_string())),
        }
    }
}

impl From<Transaction> for RawTransaction {
    fn from(tx: Transaction) -> Self {
        let kind = tx.kind_name().to_string();
        let payload = match tx {
            Transaction::Add(p) => serde_json::to_value(p),
            Transaction::Rename(p) => serde_json::to_value(p),
            Transaction::Delete(p) => serde_json::to_value(p),
            Transaction::Snapshot(node) => serde_json::to_value(node),
        }
        .unwrap_or(Value::Null);
        RawTransaction { kind, payload }
    }
}

/// Apply one transaction to an in-memory tree, the way the client keeps
/// its optimistic copy. Siblings are re-sorted after every change.
pub fn apply_transaction(tree: &Node, tx: &Transaction) -> Result<Node, CoreError> {
    match tx {
        Transaction::Add(p) => mutate::add_child(tree, &TreePath::parse(&p.path), p.data.clone()),
        Transaction::Rename(p) => {
            if p.kind == NodeKind::User {
                return Err(CoreError::Validation("Users cannot be renamed".to_string()));
            }
            mutate::rename(tree, &TreePath::parse(&p.path), &p.name)
        }
        Transaction::Delete(p) => mutate::delete_child(
            tree,
            &TreePath::parse(&p.parent),
            p.id.trim_start_matches('#'),
            p.kind,
        ),
        Transaction::Snapshot(node) => {
            let mut next = node.clone();
            next.sort_recursive();
            Ok(next)
        }
    }
}
