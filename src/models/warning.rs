use serde::{Deserialize, Serialize};

/// Non-fatal warning attached to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestoWarning {
    pub warning_code: WarningCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningCode {
    pub code: i32,
    pub name: String,
}
