use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{Column, PrestoWarning, QueryError, StatementStats};

/// One decoded server response: a slice of a query's results and status.
///
/// `columns` is present only on the first page that carries data; later
/// pages reuse the schema captured from it. A missing `next_uri` together
/// with a missing `error` means the query is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// Coordinator-assigned query id.
    pub id: String,

    /// Web UI / status URI for the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_uri: Option<String>,

    /// URI to poll for the next page. Absent on the terminal page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<String>,

    /// URI that cancels the currently running stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_cancel_uri: Option<String>,

    /// Column descriptors, present once per query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,

    /// Row batch; may be absent or empty on intermediate pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<JsonValue>>>,

    #[serde(default)]
    pub stats: StatementStats,

    /// Structured failure descriptor; its presence makes the query FAILED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PrestoWarning>,

    /// Set for DDL/DML, e.g. `CREATE TABLE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
}

impl QueryResults {
    /// Number of rows carried by this page.
    pub fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }
}
