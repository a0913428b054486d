//! Repository for the `groups` table.

use quicklab_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::group::{CreateGroup, GroupRow, GroupSelector};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, path, description, parent_group_id, subtype, created_at";

/// Provides queries over course tree groups.
pub struct GroupRepo;

impl GroupRepo {
    /// Every row matching the selector. More than one row is a consistency
    /// violation the caller is expected to report.
    pub async fn find(
        pool: &SqlitePool,
        selector: &GroupSelector,
    ) -> Result<Vec<GroupRow>, sqlx::Error> {
        match selector {
            GroupSelector::Id(id) => {
                let query = format!("SELECT {COLUMNS} FROM groups WHERE id = ?1");
                sqlx::query_as::<_, GroupRow>(&query)
                    .bind(id)
                    .fetch_all(pool)
                    .await
            }
            GroupSelector::Child {
                parent_group_id,
                name,
            } => {
                let query =
                    format!("SELECT {COLUMNS} FROM groups WHERE parent_group_id = ?1 AND name = ?2");
                sqlx::query_as::<_, GroupRow>(&query)
                    .bind(parent_group_id)
                    .bind(name)
                    .fetch_all(pool)
                    .await
            }
            GroupSelector::Path { path, name } => {
                let query = format!("SELECT {COLUMNS} FROM groups WHERE path = ?1 AND name = ?2");
                sqlx::query_as::<_, GroupRow>(&query)
                    .bind(path)
                    .bind(name)
                    .fetch_all(pool)
                    .await
            }
            GroupSelector::Course { name } => {
                let query = format!(
                    "SELECT {COLUMNS} FROM groups WHERE parent_group_id IS NULL AND name = ?1"
                );
                sqlx::query_as::<_, GroupRow>(&query)
                    .bind(name)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Insert a new group, returning the created row.
    pub async fn create(pool: &SqlitePool, input: &CreateGroup) -> Result<GroupRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO groups (name, path, description, parent_group_id, subtype)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GroupRow>(&query)
            .bind(&input.name)
            .bind(&input.path)
            .bind(&input.description)
            .bind(input.parent_group_id)
            .bind(&input.subtype)
            .fetch_one(pool)
            .await
    }

    /// Direct subgroups of a group, ordered by name.
    pub async fn list_children(
        pool: &SqlitePool,
        parent_group_id: DbId,
    ) -> Result<Vec<GroupRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM groups WHERE parent_group_id = ?1 ORDER BY name, id"
        );
        sqlx::query_as::<_, GroupRow>(&query)
            .bind(parent_group_id)
            .fetch_all(pool)
            .await
    }

    /// All root groups with subtype `course`.
    pub async fn list_courses(pool: &SqlitePool) -> Result<Vec<GroupRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM groups
             WHERE parent_group_id IS NULL AND subtype = 'course'
             ORDER BY name"
        );
        sqlx::query_as::<_, GroupRow>(&query).fetch_all(pool).await
    }

    /// Set a course's display name.
    pub async fn update_description(
        pool: &SqlitePool,
        id: DbId,
        description: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE groups SET description = ?2 WHERE id = ?1")
            .bind(id)
            .bind(description)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rename a group and rewrite the stored `path` of every descendant.
    ///
    /// Descendants are matched on whole path segments: `old_full` itself or
    /// anything below `old_full/`. Their prefix is rewritten before the group
    /// row itself changes, in one transaction.
    pub async fn rename_cascading(
        pool: &SqlitePool,
        id: DbId,
        old_full: &str,
        new_full: &str,
        new_name: &str,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let descendants = sqlx::query(
            "UPDATE groups SET path = ?2 || substr(path, length(?1) + 1)
             WHERE path = ?1 OR substr(path, 1, length(?1) + 1) = ?1 || '/'",
        )
        .bind(old_full)
        .bind(new_full)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE groups SET name = ?2 WHERE id = ?1")
            .bind(id)
            .bind(new_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(descendants.rows_affected())
    }

    /// Delete a group by ID; subgroups, memberships and repositories cascade.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete groups named `name` whose parent's full path is `path`.
    pub async fn delete_in_path(
        pool: &SqlitePool,
        path: &str,
        name: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE path = ?1 AND name = ?2")
            .bind(path)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete groups named `name` directly below `parent_group_id`.
    pub async fn delete_in_parent(
        pool: &SqlitePool,
        parent_group_id: DbId,
        name: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE parent_group_id = ?1 AND name = ?2")
            .bind(parent_group_id)
            .bind(name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
