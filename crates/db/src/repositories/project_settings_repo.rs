//! Repository for the `project_settings` table.

use quicklab_core::project_settings::ProjectDefaults;
use quicklab_core::types::DbId;
use sqlx::SqlitePool;

use crate::models::project_settings::ProjectSettingsRow;

const COLUMNS: &str = "group_id, import_kind, import_url, deny_delete_tag, member_check, \
     prevent_secrets, commit_message_regex, branch_name_regex, author_email_regex, \
     file_name_regex, max_file_size, updated_at";

/// Provides queries over per-edition project settings.
pub struct ProjectSettingsRepo;

impl ProjectSettingsRepo {
    pub async fn find(
        pool: &SqlitePool,
        group_id: DbId,
    ) -> Result<Option<ProjectSettingsRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_settings WHERE group_id = ?1");
        sqlx::query_as::<_, ProjectSettingsRow>(&query)
            .bind(group_id)
            .fetch_optional(pool)
            .await
    }

    /// Store the settings of an edition, replacing any previous row.
    pub async fn upsert(
        pool: &SqlitePool,
        group_id: DbId,
        input: &ProjectDefaults,
    ) -> Result<ProjectSettingsRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_settings (group_id, import_kind, import_url, deny_delete_tag,
                 member_check, prevent_secrets, commit_message_regex, branch_name_regex,
                 author_email_regex, file_name_regex, max_file_size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (group_id) DO UPDATE SET
                 import_kind = excluded.import_kind,
                 import_url = excluded.import_url,
                 deny_delete_tag = excluded.deny_delete_tag,
                 member_check = excluded.member_check,
                 prevent_secrets = excluded.prevent_secrets,
                 commit_message_regex = excluded.commit_message_regex,
                 branch_name_regex = excluded.branch_name_regex,
                 author_email_regex = excluded.author_email_regex,
                 file_name_regex = excluded.file_name_regex,
                 max_file_size = excluded.max_file_size,
                 updated_at = CURRENT_TIMESTAMP
             RETURNING {COLUMNS}"
        );
        let rules = &input.push_rules;
        sqlx::query_as::<_, ProjectSettingsRow>(&query)
            .bind(group_id)
            .bind(input.import_kind.as_str())
            .bind(&input.import_url)
            .bind(rules.deny_delete_tag)
            .bind(rules.member_check)
            .bind(rules.prevent_secrets)
            .bind(&rules.commit_message_regex)
            .bind(&rules.branch_name_regex)
            .bind(&rules.author_email_regex)
            .bind(&rules.file_name_regex)
            .bind(rules.max_file_size.map(i64::from))
            .fetch_one(pool)
            .await
    }
}
