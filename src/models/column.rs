use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Column descriptor advertised on the first page that carries data.
///
/// The declared type is a parametrized type string such as `varchar`,
/// `decimal(10,2)` or `array(bigint)`. The structured signature is also
/// present for nested types but the type string alone is sufficient to
/// decode cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared wire type string.
    #[serde(rename = "type")]
    pub data_type: String,

    /// Structured signature for parametrized/nested types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_signature: Option<ClientTypeSignature>,
}

/// Structured form of a parametrized type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTypeSignature {
    pub raw_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<ClientTypeSignature>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub literal_arguments: Vec<JsonValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<JsonValue>,
}
