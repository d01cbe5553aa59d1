use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};

use crate::error::AssistantError;

use super::message::ChatMessage;
use super::stream::StreamChunk;
use super::tool::Tool;

/// Stream of text and tool-call events for one model reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AssistantError>> + Send>>;

/// Stream of text fragments for one model reply.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AssistantError>> + Send>>;

/// Trait for model clients that stream chat completions.
#[async_trait]
pub trait ChatProvider: Sync + Send {
    /// Starts a streamed completion over `messages`, offering `tools` when given.
    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<ChunkStream, AssistantError>;

    /// Streams only the text fragments of a completion without tools.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream, AssistantError> {
        let chunks = self.chat_stream_with_tools(messages, None).await?;
        let text = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(StreamChunk::Text(delta)) if !delta.is_empty() => Some(Ok(delta)),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        });
        Ok(Box::pin(text))
    }
}
