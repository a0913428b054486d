//! Teaching assistants available to an edition.
//!
//! The roster lists GitLab usernames the UI offers when staffing groups.
//! Head TAs are additionally made members of the edition group itself.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::node::{Rights, User, SUBTYPE_HEAD_TA};

/// Stored link kind of a regular TA.
pub const ROSTER_TA: &str = "ta";
/// Stored link kind of a head TA.
pub const ROSTER_HEAD: &str = "head";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaRoster {
    #[serde(default)]
    pub normal_tas: Vec<String>,
    #[serde(default)]
    pub head_tas: Vec<String>,
}

impl TaRoster {
    /// Trim, strip the client's `#` marker and drop duplicates, keeping
    /// first occurrences. Fails on a blank username or one with whitespace
    /// or `/` inside.
    pub fn normalized(&self) -> Result<TaRoster, CoreError> {
        Ok(TaRoster {
            normal_tas: normalize_list(&self.normal_tas)?,
            head_tas: normalize_list(&self.head_tas)?,
        })
    }

    /// Pairs of link kind and usernames.
    pub fn by_kind(&self) -> [(&'static str, &[String]); 2] {
        [(ROSTER_TA, &self.normal_tas), (ROSTER_HEAD, &self.head_tas)]
    }

    pub fn contains(&self, username: &str) -> bool {
        self.normal_tas.iter().chain(&self.head_tas).any(|u| u == username)
    }
}

fn normalize_list(names: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim().trim_start_matches('#');
        if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(CoreError::Validation(format!(
                "'{raw}' is not a valid TA username"
            )));
        }
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// The edition membership of a head TA who has no stored account yet.
pub fn head_ta_member(username: &str, mail_domain: &str) -> User {
    let mut user = User::new(
        username,
        username,
        format!("{username}@{mail_domain}"),
        SUBTYPE_HEAD_TA,
    );
    user.rights = Rights {
        edit: true,
        share: true,
        work: true,
    };
    user
}
