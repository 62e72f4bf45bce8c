use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::exam::model::{ExamResult, MistakeRecord, User};

const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The single persisted record: user, append-only results and the mistake bank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateData {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub exam_results: Vec<ExamResult>,
    #[serde(default)]
    pub mistake_bank: Vec<MistakeRecord>,
}

impl Default for AppStateData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            user: Some(User::default()),
            exam_results: Vec::new(),
            mistake_bank: Vec::new(),
        }
    }
}

impl AppStateData {
    /// Check if loaded data has a schema version this build does not understand.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub examdr_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    pub state: AppStateData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_layout_loads() {
        let blob = r#"{
            "user": {"id": "user_1", "username": "张同学", "email": "zhang@example.com"},
            "examResults": [],
            "mistakeBank": []
        }"#;
        let state: AppStateData = serde_json::from_str(blob).unwrap();
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert!(!state.needs_reset());
        assert_eq!(state.user.unwrap().username, "张同学");
    }

    #[test]
    fn test_future_schema_needs_reset() {
        let state: AppStateData = serde_json::from_str(r#"{"schemaVersion": 99}"#).unwrap();
        assert!(state.needs_reset());
        assert!(state.exam_results.is_empty());
    }
}
