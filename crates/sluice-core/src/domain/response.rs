//! InvocationResponse - 両パス共通の結果フォーマット
//!
//! `{ statusCode, body: { message, ...context } }`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: Map<String, Value>,
}

impl InvocationResponse {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(message.into()));
        Self { status_code, body }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(STATUS_OK, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(STATUS_BAD_REQUEST, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(STATUS_INTERNAL_ERROR, message)
    }

    /// body に context を追加する
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}
