//! User rows, memberships and DTOs.

use quicklab_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRow {
    pub id: DbId,
    pub name: String,
    pub mail_address: String,
    pub gitlab_username: String,
}

/// DTO for inserting a user; the username is the natural key.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub mail_address: String,
    pub gitlab_username: String,
}

/// A user joined with its membership in one group.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberRow {
    pub user_id: DbId,
    pub name: String,
    pub mail_address: String,
    pub gitlab_username: String,
    pub edit: bool,
    pub share: bool,
    pub work: bool,
    pub subtype: String,
}

/// DTO for linking a user to a group.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrivilege {
    pub group_id: DbId,
    pub user_id: DbId,
    pub edit: bool,
    pub share: bool,
    pub work: bool,
    pub subtype: String,
}
