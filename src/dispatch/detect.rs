use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolCall;

use super::call::MovieCall;

static CALL_MARKER: OnceLock<Regex> = OnceLock::new();

fn call_marker() -> &'static Regex {
    CALL_MARKER.get_or_init(|| Regex::new(r#"\{\s*"function"\s*:"#).expect("valid marker regex"))
}

/// A completed model reply: streamed text plus any structured tool calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Plain answer.
    None,
    Call(MovieCall),
    /// The reply looked like a call but failed validation.
    Malformed(String),
}

/// How function calls are recognized in a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDetector {
    /// A JSON object opening with a `"function"` key in the reply text.
    TextSentinel,
    /// The provider's structured tool-call channel.
    StructuredTool,
}

impl CallDetector {
    pub fn detect(&self, reply: &ModelReply) -> Detection {
        match self {
            CallDetector::TextSentinel => detect_text(&reply.text),
            CallDetector::StructuredTool => detect_tool_call(&reply.tool_calls),
        }
    }

    /// Whether tool schemas are sent with each request.
    pub fn offers_tools(&self) -> bool {
        matches!(self, CallDetector::StructuredTool)
    }
}

fn detect_text(text: &str) -> Detection {
    if !call_marker().is_match(text) {
        return Detection::None;
    }
    let parsed = serde_json::from_str::<Value>(text.trim()).and_then(MovieCall::from_value);
    match parsed {
        Ok(call) => Detection::Call(call),
        Err(err) => Detection::Malformed(err.to_string()),
    }
}

fn detect_tool_call(tool_calls: &[ToolCall]) -> Detection {
    let Some(tool_call) = tool_calls.first() else {
        return Detection::None;
    };
    match MovieCall::from_tool_call(&tool_call.function.name, &tool_call.function.arguments) {
        Ok(call) => Detection::Call(call),
        Err(err) => Detection::Malformed(format!("{}: {}", tool_call.function.name, err)),
    }
}
