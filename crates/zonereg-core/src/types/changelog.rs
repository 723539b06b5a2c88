use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ChangeLogId;

/// What happened to the audited row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Saved,
    Deleted,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Saved => write!(f, "saved"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Append-only audit record of one save or delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Row id
    pub id: ChangeLogId,

    /// Table of the audited row, e.g. `hosts`
    pub table: String,

    /// Surrogate id of the audited row
    pub row: u64,

    /// Full row snapshot at the time of the change
    pub data: serde_json::Value,

    /// Save or delete
    pub action: ChangeAction,

    /// When the change was applied
    pub timestamp: DateTime<Utc>,
}
