//! Wire types for the Sheets v4 values API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `ValueRange` as returned by `spreadsheets.values.get`.
///
/// `values` is omitted entirely when the range is empty.
#[derive(Debug, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

/// Request body for `spreadsheets.values.append`.
#[derive(Debug, Serialize)]
pub struct AppendBody {
    pub values: Vec<Vec<Value>>,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Render a cell as the text a spreadsheet user would see.
#[must_use]
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
