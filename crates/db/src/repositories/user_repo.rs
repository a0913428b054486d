//! Repository for the `users` and `user_privileges` tables.

use quicklab_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::user::{CreatePrivilege, CreateUser, MemberRow, UserRow};

const COLUMNS: &str = "id, name, mail_address, gitlab_username";

const MEMBER_COLUMNS: &str = "u.id AS user_id, u.name, u.mail_address, u.gitlab_username, \
     p.edit, p.share, p.work, p.subtype";

/// Provides queries over users and their group memberships.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user, or refresh name and mail of the existing one with
    /// the same username. Returns the stored row either way.
    pub async fn upsert(pool: &SqlitePool, input: &CreateUser) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, mail_address, gitlab_username)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (gitlab_username)
             DO UPDATE SET name = excluded.name, mail_address = excluded.mail_address
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.name)
            .bind(&input.mail_address)
            .bind(&input.gitlab_username)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE gitlab_username = ?1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Link a user to a group, updating rights and subtype if already linked.
    pub async fn upsert_privilege(
        pool: &SqlitePool,
        input: &CreatePrivilege,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_privileges (group_id, user_id, edit, share, work, subtype)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (group_id, user_id)
             DO UPDATE SET edit = excluded.edit, share = excluded.share,
                           work = excluded.work, subtype = excluded.subtype",
        )
        .bind(input.group_id)
        .bind(input.user_id)
        .bind(input.edit)
        .bind(input.share)
        .bind(input.work)
        .bind(&input.subtype)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Members of a group with their rights.
    pub async fn list_members(
        pool: &SqlitePool,
        group_id: DbId,
    ) -> Result<Vec<MemberRow>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS}
             FROM users u INNER JOIN user_privileges p ON p.user_id = u.id
             WHERE p.group_id = ?1
             ORDER BY u.name, u.gitlab_username"
        );
        sqlx::query_as::<_, MemberRow>(&query)
            .bind(group_id)
            .fetch_all(pool)
            .await
    }

    /// Remove one membership; the user row stays.
    pub async fn remove_privilege(
        pool: &SqlitePool,
        group_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_privileges WHERE group_id = ?1 AND user_id = ?2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove the membership of the user with this username in a group.
    pub async fn remove_privilege_by_username(
        pool: &SqlitePool,
        group_id: DbId,
        username: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_privileges
             WHERE group_id = ?1
               AND user_id IN (SELECT id FROM users WHERE gitlab_username = ?2)",
        )
        .bind(group_id)
        .bind(username)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every membership of the user in the group with full path
    /// `group_full` and the groups below it.
    pub async fn remove_privileges_in_subtree(
        pool: &SqlitePool,
        group_id: DbId,
        group_full: &str,
        username: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_privileges
             WHERE user_id IN (SELECT id FROM users WHERE gitlab_username = ?3)
               AND group_id IN (
                   SELECT id FROM groups
                   WHERE id = ?1 OR path = ?2 OR substr(path, 1, length(?2) + 1) = ?2 || '/'
               )",
        )
        .bind(group_id)
        .bind(group_full)
        .bind(username)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a user outright, dropping all of its memberships.
    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
