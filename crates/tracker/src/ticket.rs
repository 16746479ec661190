use std::collections::BTreeMap;

use serde::Serialize;

/// Normalized ticket metadata, regardless of which backend produced it.
///
/// Missing values are empty strings. `custom_fields` is `None` unless at
/// least one configured custom field resolved to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketInfo {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub summary: String,
    pub status: String,
    /// Only populated by the API-backed client.
    pub priority: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<BTreeMap<String, String>>,
}
