use async_trait::async_trait;

use crate::error::AssistantError;

/// Receives streamed assistant text as it is produced.
///
/// One model call maps to one `begin_reply` / `end_reply` pair; a turn that
/// dispatches a function produces more than one reply.
#[async_trait]
pub trait ReplySink: Send {
    async fn begin_reply(&mut self) -> Result<(), AssistantError> {
        Ok(())
    }

    async fn push_token(&mut self, token: &str) -> Result<(), AssistantError>;

    async fn end_reply(&mut self) -> Result<(), AssistantError> {
        Ok(())
    }
}

/// Discards all output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ReplySink for NullSink {
    async fn push_token(&mut self, _token: &str) -> Result<(), AssistantError> {
        Ok(())
    }
}

/// Collects every reply in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    replies: Vec<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.replies.last().map(String::as_str)
    }
}

#[async_trait]
impl ReplySink for BufferSink {
    async fn begin_reply(&mut self) -> Result<(), AssistantError> {
        self.replies.push(String::new());
        Ok(())
    }

    async fn push_token(&mut self, token: &str) -> Result<(), AssistantError> {
        match self.replies.last_mut() {
            Some(reply) => reply.push_str(token),
            None => self.replies.push(token.to_string()),
        }
        Ok(())
    }
}
