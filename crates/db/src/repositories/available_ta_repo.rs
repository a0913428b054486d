//! Repository for the `available_tas` table.

use quicklab_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::available_ta::AvailableTaRow;

const COLUMNS: &str = "id, group_id, gitlab_username, subtype";

/// Provides queries over the TAs linked to an edition group.
pub struct AvailableTaRepo;

impl AvailableTaRepo {
    /// Every link of the group, in insertion order.
    pub async fn list(pool: &SqlitePool, group_id: DbId) -> Result<Vec<AvailableTaRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM available_tas WHERE group_id = ?1 ORDER BY id");
        sqlx::query_as::<_, AvailableTaRow>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// Link a username; an existing link is left as is.
    pub async fn link(
        pool: &SqlitePool,
        group_id: DbId,
        username: &str,
        subtype: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO available_tas (group_id, gitlab_username, subtype)
             VALUES (?1, ?2, ?3)",
        )
        .bind(group_id)
        .bind(username)
        .bind(subtype)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unlink(
        pool: &SqlitePool,
        group_id: DbId,
        username: &str,
        subtype: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM available_tas
             WHERE group_id = ?1 AND gitlab_username = ?2 AND subtype = ?3",
        )
        .bind(group_id)
        .bind(username)
        .bind(subtype)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
