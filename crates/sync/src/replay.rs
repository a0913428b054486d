//! Transaction log replay.
//!
//! A log is applied strictly in order. The first entry that fails stops
//! the replay; later entries are never looked at. Whatever the outcome,
//! the caller gets the edition as it is now stored so it can discard its
//! optimistic copy.

use quicklab_core::error::CoreError;
use quicklab_core::node::{Node, NodeKind};
use quicklab_core::path::TreePath;
use quicklab_core::transaction::{RawTransaction, Transaction};
use quicklab_db::models::group::DeleteRequest;
use quicklab_db::store::GroupRef;
use quicklab_db::{StoreError, TreeStore};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Entry `index` failed; nothing after it was applied.
    #[error("Transaction {index} ({kind}) failed: {source}")]
    Aborted {
        index: usize,
        kind: String,
        #[source]
        source: StoreError,
        canonical: Box<Node>,
    },

    /// Reloading the stored edition failed.
    #[error("Failed to reload the stored tree: {0}")]
    Canonical(#[source] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub applied: usize,
    pub tree: Node,
}

#[derive(Clone)]
pub struct TransactionReplayer {
    store: TreeStore,
}

impl TransactionReplayer {
    pub fn new(store: TreeStore) -> Self {
        Self { store }
    }

    /// Apply `log` and return the stored `course`/`edition` tree.
    ///
    /// A rename of the course or edition itself moves the tree that is
    /// reloaded at the end.
    pub async fn replay(
        &self,
        course: &str,
        edition: &str,
        log: &[RawTransaction],
    ) -> Result<ReplayOutcome, ReplayError> {
        let mut target = Target {
            course: course.to_string(),
            edition: edition.to_string(),
        };
        for (index, raw) in log.iter().enumerate() {
            if let Err(source) = self.apply(&mut target, raw).await {
                tracing::warn!(
                    index,
                    kind = %raw.kind,
                    skipped = log.len() - index - 1,
                    error = %source,
                    "Transaction failed, aborting replay",
                );
                let canonical = self.canonical(&target).await?;
                return Err(ReplayError::Aborted {
                    index,
                    kind: raw.kind.clone(),
                    source,
                    canonical: Box::new(canonical),
                });
            }
        }

        tracing::debug!(
            course = %target.course,
            edition = %target.edition,
            applied = log.len(),
            "Replayed transaction log"
        );
        Ok(ReplayOutcome {
            applied: log.len(),
            tree: self.canonical(&target).await?,
        })
    }

    /// Apply one entry to the store, moving `target` along with a rename
    /// of the replayed course or edition.
    async fn apply(&self, target: &mut Target, raw: &RawTransaction) -> Result<(), StoreError> {
        match Transaction::try_from(raw)? {
            Transaction::Add(p) => {
                let parent = GroupRef::Path(TreePath::parse(&p.path));
                self.store.add_node(&parent, &p.data).await
            }
            Transaction::Rename(p) => {
                let path = TreePath::parse(&p.path);
                match p.kind {
                    NodeKind::Group => {
                        self.store.rename_group(&path, &p.name).await?;
                        target.follow_rename(&path, &p.name);
                        Ok(())
                    }
                    NodeKind::Project => self
                        .store
                        .rename_repository(&path, &p.name)
                        .await
                        .map(|_| ()),
                    NodeKind::User => {
                        Err(CoreError::Validation("Users cannot be renamed".to_string()).into())
                    }
                }
            }
            Transaction::Delete(p) => {
                let request = DeleteRequest::by_name_in_path(p.id.clone(), p.parent.clone());
                let deleted = match p.kind {
                    NodeKind::Group => self.store.delete_group(&request).await?,
                    NodeKind::Project => self.store.delete_repository(&request).await?,
                    NodeKind::User => self.store.delete_user(&request).await?,
                };
                if !deleted {
                    tracing::warn!(parent = %p.parent, id = %p.id, kind = %p.kind, "Delete matched nothing");
                }
                Ok(())
            }
            Transaction::Snapshot(tree) => {
                target.check_snapshot(&tree)?;
                self.store.import_course(&tree).await.map(|_| ())
            }
        }
    }

    async fn canonical(&self, target: &Target) -> Result<Node, ReplayError> {
        self.store
            .load_edition(&target.course, &target.edition)
            .await
            .map_err(ReplayError::Canonical)
    }
}

/// The course and edition a log is replayed against.
#[derive(Debug)]
struct Target {
    course: String,
    edition: String,
}

impl Target {
    /// A snapshot may only replace the edition being replayed.
    fn check_snapshot(&self, tree: &Node) -> Result<(), CoreError> {
        let edition = tree.edition().map(Node::id);
        if tree.id() != self.course || edition != Some(self.edition.as_str()) {
            return Err(CoreError::Validation(format!(
                "snapshot of '{}/{}' cannot replace '{}/{}'",
                tree.id(),
                edition.unwrap_or_default(),
                self.course,
                self.edition
            )));
        }
        Ok(())
    }

    fn follow_rename(&mut self, path: &TreePath, new_name: &str) {
        match path.segments() {
            [course] if *course == self.course => self.course = new_name.to_string(),
            [course, edition] if *course == self.course && *edition == self.edition => {
                self.edition = new_name.to_string()
            }
            _ => {}
        }
    }
}
