//! Wire types for the stdio server: JSON-RPC 2.0 envelopes and the MCP
//! `tools/call` result shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An incoming line. Requests carry an `id`; notifications do not.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Parse,
    MethodNotFound,
    InvalidParams,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            Self::Parse => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error { code: i64, message: String },
}

#[derive(Debug, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: Value, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error {
                code: code.code(),
                message: message.into(),
            },
        }
    }
}

/// Outcome of a single tool call, rendered as one text content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error
        })
    }
}
