//! Hosting-platform membership access levels.

use serde::{Deserialize, Serialize};

use crate::node::{SUBTYPE_HEAD_TA, SUBTYPE_OWNER, SUBTYPE_STUDENT, SUBTYPE_TA};

/// Numeric membership levels understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AccessLevel {
    Guest = 10,
    Reporter = 20,
    Developer = 30,
    Maintainer = 40,
    Owner = 50,
}

impl AccessLevel {
    /// Level granted to a user node of the given subtype.
    pub fn for_subtype(subtype: &str) -> Self {
        match subtype {
            SUBTYPE_STUDENT => AccessLevel::Developer,
            SUBTYPE_TA => AccessLevel::Maintainer,
            SUBTYPE_HEAD_TA | SUBTYPE_OWNER => AccessLevel::Owner,
            _ => AccessLevel::Reporter,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<AccessLevel> for u8 {
    fn from(level: AccessLevel) -> Self {
        level.as_u8()
    }
}

impl TryFrom<u8> for AccessLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(AccessLevel::Guest),
            20 => Ok(AccessLevel::Reporter),
            30 => Ok(AccessLevel::Developer),
            40 => Ok(AccessLevel::Maintainer),
            50 => Ok(AccessLevel::Owner),
            other => Err(format!("invalid access level {other}")),
        }
    }
}
