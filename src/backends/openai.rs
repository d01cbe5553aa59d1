//! OpenAI chat-completions client.
//!
//! Streams `/chat/completions` replies as [`StreamChunk`]s. Tool-call
//! arguments arrive as JSON fragments spread over several events and are
//! assembled into complete [`ToolCall`]s once the model finishes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::chat::{
    create_sse_stream, ChatMessage, ChatProvider, ChunkStream, GenerationOptions, SseParser,
    StreamChunk, Tool, ToolChoice,
};
use crate::error::AssistantError;
use crate::{FunctionCall, ToolCall};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const CHAT_ENDPOINT: &str = "chat/completions";
const DONE_MARKER: &str = "[DONE]";

/// Configuration for the OpenAI client.
#[derive(Debug)]
pub struct OpenAIConfig {
    /// API key for authentication with OpenAI.
    pub api_key: SecretString,
    /// Base URL, always ending with a slash.
    pub base_url: Url,
    /// Generation settings sent with every request.
    pub options: GenerationOptions,
}

/// Client for OpenAI-compatible chat-completion APIs.
///
/// The client uses `Arc` internally for configuration, making cloning cheap.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub config: Arc<OpenAIConfig>,
    pub client: Client,
}

#[derive(Serialize, Debug)]
struct OpenAIChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize, Debug)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize, Debug)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl OpenAI {
    /// Creates a new OpenAI client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `base_url` - Alternative API root for compatible servers
    /// * `options` - Model, temperature, token cap and timeout
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        options: GenerationOptions,
    ) -> Result<Self, AssistantError> {
        let mut builder = Client::builder();
        if let Some(sec) = options.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(sec));
        }
        let client = builder.build()?;
        Self::with_client(client, api_key, base_url, options)
    }

    /// Creates a new OpenAI client with a custom HTTP client.
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: Option<String>,
        options: GenerationOptions,
    ) -> Result<Self, AssistantError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AssistantError::AuthError("Missing OpenAI API key".to_string()));
        }
        let base_url = parse_base_url(base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        Ok(Self {
            config: Arc::new(OpenAIConfig {
                api_key: SecretString::new(api_key),
                base_url,
                options,
            }),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.options.model
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.config.options
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        tools: Option<&'a [Tool]>,
    ) -> OpenAIChatRequest<'a> {
        let tools = tools.filter(|tools| !tools.is_empty());
        OpenAIChatRequest {
            model: &self.config.options.model,
            messages: messages
                .iter()
                .map(|m| OpenAIChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.config.options.max_tokens,
            temperature: self.config.options.temperature,
            stream: true,
            tool_choice: tools.map(|_| ToolChoice::Auto),
            tools,
        }
    }

    async fn ensure_success_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AssistantError> {
        log::debug!("OpenAI HTTP status: {}", response.status());
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await?;
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AssistantError::AuthError(format!(
                "OpenAI rejected credentials ({status}): {error_text}"
            )));
        }
        Err(AssistantError::ResponseFormatError {
            message: format!("OpenAI API returned error status: {status}"),
            raw_response: error_text,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAI {
    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<ChunkStream, AssistantError> {
        let body = self.build_request(messages, tools);

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&body) {
                log::trace!("OpenAI request payload: {}", json);
            }
        }

        let url = self
            .config
            .base_url
            .join(CHAT_ENDPOINT)
            .map_err(|e| AssistantError::HttpError(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let response = Self::ensure_success_response(response).await?;

        Ok(create_sse_stream(response, ChunkParser::default()))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, AssistantError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|e| AssistantError::InvalidRequest(format!("invalid base URL `{raw}`: {e}")))
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Turns chat-completion SSE events into [`StreamChunk`]s.
#[derive(Debug, Default)]
struct ChunkParser {
    pending: BTreeMap<usize, PartialToolCall>,
    finished: bool,
}

impl SseParser<StreamChunk> for ChunkParser {
    fn parse_event(&mut self, event: &str) -> Result<Vec<StreamChunk>, AssistantError> {
        let mut chunks = Vec::new();
        for line in event.lines() {
            let Some(data) = line.trim().strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_MARKER {
                self.finish("stop", &mut chunks);
                continue;
            }
            let parsed: ChatStreamChunk =
                serde_json::from_str(data).map_err(|e| AssistantError::ResponseFormatError {
                    message: format!("Failed to decode OpenAI stream chunk: {e}"),
                    raw_response: data.to_string(),
                })?;
            if let Some(error) = parsed.error {
                return Err(AssistantError::ProviderError(error.to_string()));
            }
            for choice in parsed.choices {
                self.apply_choice(choice, &mut chunks);
            }
        }
        Ok(chunks)
    }

    /// A body that ends without `[DONE]` or a finish reason still completes
    /// the tool calls assembled so far.
    fn end_of_stream(&mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        if self.finished {
            return chunks;
        }
        log::warn!(
            "OpenAI stream ended without a finish reason; completing {} pending tool call(s)",
            self.pending.len()
        );
        self.finish("eof", &mut chunks);
        chunks
    }
}

impl ChunkParser {
    fn apply_choice(&mut self, choice: ChatStreamChoice, out: &mut Vec<StreamChunk>) {
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            out.push(StreamChunk::Text(content));
        }
        for delta in choice.delta.tool_calls.unwrap_or_default() {
            self.apply_tool_delta(delta, out);
        }
        if let Some(reason) = choice.finish_reason {
            self.finish(&reason, out);
        }
    }

    fn apply_tool_delta(&mut self, delta: ToolCallDelta, out: &mut Vec<StreamChunk>) {
        let index = delta.index;
        let is_new = !self.pending.contains_key(&index);
        let call = self.pending.entry(index).or_default();
        if let Some(id) = delta.id {
            call.id = id;
        }
        let (name, arguments) = match delta.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        if let Some(name) = name {
            call.name.push_str(&name);
        }
        if is_new {
            out.push(StreamChunk::ToolUseStart {
                index,
                id: call.id.clone(),
                name: call.name.clone(),
            });
        }
        if let Some(partial_json) = arguments.filter(|a| !a.is_empty()) {
            call.arguments.push_str(&partial_json);
            out.push(StreamChunk::ToolUseInputDelta {
                index,
                partial_json,
            });
        }
    }

    fn finish(&mut self, reason: &str, out: &mut Vec<StreamChunk>) {
        if self.finished {
            return;
        }
        self.finished = true;
        for (index, call) in std::mem::take(&mut self.pending) {
            out.push(StreamChunk::ToolUseComplete {
                index,
                tool_call: ToolCall {
                    id: call.id,
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: call.name,
                        arguments: call.arguments,
                    },
                },
            });
        }
        out.push(StreamChunk::Done {
            stop_reason: reason.to_string(),
        });
    }
}
