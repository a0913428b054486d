//! Repository for the `repositories` table.

use quicklab_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::repository::{CreateRepository, RepositoryRow};

const COLUMNS: &str = "id, name, group_id, repo";

/// Provides queries over project repositories.
pub struct RepositoryRepo;

impl RepositoryRepo {
    /// Insert a repository, or update the descriptor of an existing one
    /// with the same name in the same group.
    pub async fn upsert(
        pool: &SqlitePool,
        input: &CreateRepository,
    ) -> Result<RepositoryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO repositories (name, group_id, repo)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (group_id, name) DO UPDATE SET repo = excluded.repo
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RepositoryRow>(&query)
            .bind(&input.name)
            .bind(input.group_id)
            .bind(&input.repo)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_group(
        pool: &SqlitePool,
        group_id: DbId,
    ) -> Result<Vec<RepositoryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repositories WHERE group_id = ?1 ORDER BY name");
        sqlx::query_as::<_, RepositoryRow>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_in_group(
        pool: &SqlitePool,
        group_id: DbId,
        name: &str,
    ) -> Result<Option<RepositoryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM repositories WHERE group_id = ?1 AND name = ?2");
        sqlx::query_as::<_, RepositoryRow>(&query)
            .bind(group_id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Rename the repository `old_name` of a group. Returns `false` if absent.
    pub async fn rename(
        pool: &SqlitePool,
        group_id: DbId,
        old_name: &str,
        new_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE repositories SET name = ?3 WHERE group_id = ?1 AND name = ?2")
            .bind(group_id)
            .bind(old_name)
            .bind(new_name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM repositories WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_in_group(
        pool: &SqlitePool,
        group_id: DbId,
        name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM repositories WHERE group_id = ?1 AND name = ?2")
            .bind(group_id)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
