use serde::{Deserialize, Serialize};

use crate::models::{Field, PlatformId, SelectorValue};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub platform: PlatformId,
    #[serde(rename = "selector")]
    pub field: Field,
    pub old: Option<SelectorValue>,
    pub new: Option<SelectorValue>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiffReason {
    /// Nothing to compare against: first run or unreadable store.
    NoBaseline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigDiff {
    pub changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DiffReason>,
    pub count: usize,
    pub changes: Vec<FieldChange>,
}

impl ConfigDiff {
    pub fn no_baseline() -> Self {
        Self {
            changed: true,
            reason: Some(DiffReason::NoBaseline),
            count: 0,
            changes: Vec::new(),
        }
    }

    pub fn from_changes(changes: Vec<FieldChange>) -> Self {
        Self {
            changed: !changes.is_empty(),
            reason: None,
            count: changes.len(),
            changes,
        }
    }

    pub fn summary(&self) -> String {
        match self.reason {
            Some(DiffReason::NoBaseline) => "First run or missing config".to_string(),
            None => format!("{} selectors changed", self.count),
        }
    }
}
