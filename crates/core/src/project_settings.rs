//! Per-edition defaults applied to every provisioned project.
//!
//! An edition stores at most one settings record. It decides how new
//! projects are seeded (empty, imported from a URL, or from an archive
//! on disk) and which push rules are attached after creation.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How a newly created project is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    #[default]
    Empty,
    Url,
    #[serde(alias = "zip", alias = "file")]
    Archive,
    /// Accepted in stored settings but refused when provisioning.
    Fork,
}

impl ImportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Empty => "empty",
            ImportKind::Url => "url",
            ImportKind::Archive => "archive",
            ImportKind::Fork => "fork",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "empty" => Ok(ImportKind::Empty),
            "url" => Ok(ImportKind::Url),
            "archive" | "zip" | "file" => Ok(ImportKind::Archive),
            "fork" => Ok(ImportKind::Fork),
            other => Err(CoreError::Validation(format!("Unknown import kind '{other}'"))),
        }
    }
}

/// Push-rule policy attached to projects after creation.
///
/// Empty regex strings are treated as "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushRules {
    pub deny_delete_tag: bool,
    pub member_check: bool,
    pub prevent_secrets: bool,
    pub commit_message_regex: Option<String>,
    pub branch_name_regex: Option<String>,
    pub author_email_regex: Option<String>,
    pub file_name_regex: Option<String>,
    /// Megabytes; `None` leaves the platform default.
    pub max_file_size: Option<u32>,
}

impl Default for PushRules {
    fn default() -> Self {
        Self {
            deny_delete_tag: true,
            member_check: true,
            prevent_secrets: true,
            commit_message_regex: None,
            branch_name_regex: None,
            author_email_regex: None,
            file_name_regex: None,
            max_file_size: None,
        }
    }
}

impl PushRules {
    fn regexes(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("commit_message_regex", self.commit_message_regex.as_deref()),
            ("branch_name_regex", self.branch_name_regex.as_deref()),
            ("author_email_regex", self.author_email_regex.as_deref()),
            ("file_name_regex", self.file_name_regex.as_deref()),
        ]
    }

    /// Reject patterns that do not compile.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, pattern) in self.regexes() {
            if let Some(pattern) = pattern.filter(|p| !p.is_empty()) {
                Regex::new(pattern).map_err(|e| {
                    CoreError::Validation(format!("{field} is not a valid regex: {e}"))
                })?;
            }
        }
        Ok(())
    }

    /// Normalise empty patterns to `None`.
    pub fn normalized(mut self) -> Self {
        for slot in [
            &mut self.commit_message_regex,
            &mut self.branch_name_regex,
            &mut self.author_email_regex,
            &mut self.file_name_regex,
        ] {
            if slot.as_deref().is_some_and(str::is_empty) {
                *slot = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDefaults {
    pub import_kind: ImportKind,
    /// Source URL for [`ImportKind::Url`], local archive path for [`ImportKind::Archive`].
    pub import_url: Option<String>,
    pub push_rules: PushRules,
}

impl ProjectDefaults {
    pub fn validate(&self) -> Result<(), CoreError> {
        let needs_source = matches!(
            self.import_kind,
            ImportKind::Url | ImportKind::Archive | ImportKind::Fork
        );
        if needs_source && self.import_url.as_deref().map_or(true, str::is_empty) {
            return Err(CoreError::Validation(format!(
                "import_url is required for import kind '{}'",
                self.import_kind.as_str()
            )));
        }
        self.push_rules.validate()
    }
}
