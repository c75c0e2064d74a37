use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error descriptor embedded in an otherwise normal response.
///
/// A page carrying one of these means the query failed on the engine; the
/// HTTP status is still 200. The `retriable` flag is the server's guidance
/// on whether re-polling the same page URI can succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error_code: i32,

    #[serde(default)]
    pub error_name: Option<String>,

    /// Error category: `USER_ERROR`, `INTERNAL_ERROR`, `EXTERNAL`,
    /// `INSUFFICIENT_RESOURCES`.
    #[serde(default)]
    pub error_type: Option<String>,

    /// Server guidance: the failure is transient and the same page URI may
    /// be polled again.
    #[serde(default)]
    pub retriable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_location: Option<ErrorLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_info: Option<FailureInfo>,
}

impl QueryError {
    /// Whether the server marked this failure as retryable.
    pub fn is_retryable(&self) -> bool {
        self.retriable
    }

    /// Error message, or a placeholder when the engine supplied none.
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or("the engine did not return an error message")
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.error_name.as_deref().unwrap_or("UNKNOWN"),
            self.error_type.as_deref().unwrap_or("UNKNOWN"),
            self.message()
        )?;
        if let Some(location) = &self.error_location {
            write!(
                f,
                " at line {}:{}",
                location.line_number, location.column_number
            )?;
        }
        Ok(())
    }
}

/// Position of the failure within the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    pub line_number: u32,
    pub column_number: u32,
}

/// Engine-side failure detail (exception type, message, stack).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_location: Option<ErrorLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_recorded_error() {
        // Shape taken from a real coordinator syntax-error response.
        let json = serde_json::json!({
            "errorCode": 1,
            "errorLocation": {"columnNumber": 15, "lineNumber": 1},
            "errorName": "SYNTAX_ERROR",
            "errorType": "USER_ERROR",
            "failureInfo": {
                "type": "com.facebook.presto.sql.analyzer.SemanticException",
                "message": "line 1:15: Schema must be specified when session schema is not set",
                "stack": ["StatementAnalyzer.visitTable(StatementAnalyzer.java:529)"]
            },
            "message": "line 1:15: Schema must be specified when session schema is not set"
        });
        let error: QueryError = serde_json::from_value(json).unwrap();
        assert_eq!(error.error_name.as_deref(), Some("SYNTAX_ERROR"));
        assert_eq!(error.error_type.as_deref(), Some("USER_ERROR"));
        assert!(!error.is_retryable());
        assert_eq!(error.error_location.unwrap().column_number, 15);
        assert!(error.to_string().contains("SYNTAX_ERROR"));
        assert!(error.to_string().contains("line 1:15"));
    }

    #[test]
    fn retriable_flag_is_honored() {
        let error: QueryError = serde_json::from_value(serde_json::json!({
            "errorCode": 131075,
            "errorName": "SERVER_STARTING_UP",
            "errorType": "EXTERNAL",
            "retriable": true,
            "message": "coordinator overloaded"
        }))
        .unwrap();
        assert!(error.is_retryable());
    }

    #[test]
    fn missing_message_gets_placeholder() {
        let error: QueryError =
            serde_json::from_value(serde_json::json!({"errorCode": 7})).unwrap();
        assert_eq!(error.message(), "the engine did not return an error message");
    }
}
