//! JSON bodies returned by the HTTP endpoint

use crate::scanner::{ScanResult, UpgradeWindow};
use serde::{Deserialize, Serialize};

/// Message returned when the log holds no full-system upgrade
pub const NOT_FOUND_MESSAGE: &str = "can not get information about last system update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpgradeResponse {
    Window { start_time: i64, end_time: i64 },
    Error { error: String },
}

impl UpgradeResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Only integers and strings, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<UpgradeWindow> for UpgradeResponse {
    fn from(window: UpgradeWindow) -> Self {
        Self::Window {
            start_time: window.start,
            end_time: window.end,
        }
    }
}

impl From<ScanResult> for UpgradeResponse {
    fn from(result: ScanResult) -> Self {
        match result {
            ScanResult::Found(window) => window.into(),
            ScanResult::NotFound => Self::error(NOT_FOUND_MESSAGE),
        }
    }
}
