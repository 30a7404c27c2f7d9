//! C8 RPC Frame Handler: JSON-RPC 2.0 envelope types shared by both
//! transports (spec §4.8). Stdio frames one object per line; SSE frames
//! the same objects as `data:` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Parses one line of stdio input into a request, mapping malformed JSON
/// to the `-32700` parse-error response the caller should write back
/// immediately (spec §4.8, §7 — framing errors are protocol-level, unlike
/// domain errors which fold into the content envelope).
pub fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcError> {
    serde_json::from_str::<JsonRpcRequest>(line)
        .map_err(|e| JsonRpcError::new(PARSE_ERROR, format!("parse error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_request() {
        let req = parse_request(r#"{"jsonrpc":"2.0","method":"tools/call","params":{},"id":1}"#)
            .unwrap();
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, Some(Value::from(1)));
    }

    #[test]
    fn malformed_json_maps_to_parse_error() {
        let err = parse_request("{not json").unwrap_err();
        assert_eq!(err.code, PARSE_ERROR);
    }

    #[test]
    fn success_response_omits_error_field() {
        let resp = JsonRpcResponse::success(Some(Value::from(1)), serde_json::json!({"ok": true}));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_response_omits_result_field() {
        let resp = JsonRpcResponse::failure(
            Some(Value::from(1)),
            JsonRpcError::new(METHOD_NOT_FOUND, "unknown method"),
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], serde_json::json!(METHOD_NOT_FOUND));
    }
}
