//! Edition project settings rows.

use quicklab_core::error::CoreError;
use quicklab_core::project_settings::{ImportKind, ProjectDefaults, PushRules};
use quicklab_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `project_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSettingsRow {
    pub group_id: DbId,
    pub import_kind: String,
    pub import_url: Option<String>,
    pub deny_delete_tag: bool,
    pub member_check: bool,
    pub prevent_secrets: bool,
    pub commit_message_regex: Option<String>,
    pub branch_name_regex: Option<String>,
    pub author_email_regex: Option<String>,
    pub file_name_regex: Option<String>,
    pub max_file_size: Option<i64>,
    pub updated_at: Timestamp,
}

impl TryFrom<ProjectSettingsRow> for ProjectDefaults {
    type Error = CoreError;

    fn try_from(row: ProjectSettingsRow) -> Result<Self, Self::Error> {
        let max_file_size = row
            .max_file_size
            .map(u32::try_from)
            .transpose()
            .map_err(|_| CoreError::Validation("max_file_size out of range".to_string()))?;
        Ok(ProjectDefaults {
            import_kind: ImportKind::parse(&row.import_kind)?,
            import_url: row.import_url,
            push_rules: PushRules {
                deny_delete_tag: row.deny_delete_tag,
                member_check: row.member_check,
                prevent_secrets: row.prevent_secrets,
                commit_message_regex: row.commit_message_regex,
                branch_name_regex: row.branch_name_regex,
                author_email_regex: row.author_email_regex,
                file_name_regex: row.file_name_regex,
                max_file_size,
            },
        })
    }
}
