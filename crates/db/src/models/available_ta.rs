//! Edition TA roster rows.

use quicklab_core::roster::{TaRoster, ROSTER_HEAD};
use quicklab_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `available_tas` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailableTaRow {
    pub id: DbId,
    pub group_id: DbId,
    pub gitlab_username: String,
    pub subtype: String,
}

impl FromIterator<AvailableTaRow> for TaRoster {
    fn from_iter<I: IntoIterator<Item = AvailableTaRow>>(rows: I) -> Self {
        let mut roster = TaRoster::default();
        for row in rows {
            if row.subtype == ROSTER_HEAD {
                roster.head_tas.push(row.gitlab_username);
            } else {
                roster.normal_tas.push(row.gitlab_username);
            }
        }
        roster
    }
}
