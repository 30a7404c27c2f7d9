//! The content envelope every tool result is wrapped in, identical across
//! tools and transports (spec §4.7/§6):
//! `{content: [{type:"text", text}], isError?: true}`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContentEnvelope {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ContentEnvelope {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: None,
        }
    }

    /// Folds a domain error into the envelope with `isError: true` — the
    /// dispatcher never returns these as JSON-RPC errors (spec §4.7/§7).
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: Some(true),
        }
    }
}
