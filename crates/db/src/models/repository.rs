//! Project repository rows.

use quicklab_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `repositories` table (a project node).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RepositoryRow {
    pub id: DbId,
    pub name: String,
    pub group_id: DbId,
    pub repo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRepository {
    pub name: String,
    pub group_id: DbId,
    pub repo: String,
}
