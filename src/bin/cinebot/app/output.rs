use std::io::{self, Write};

use async_trait::async_trait;

use cinebot::dispatch::ReplySink;
use cinebot::error::AssistantError;

const STREAM_FLUSH_THRESHOLD: usize = 32;

/// Streams assistant replies to stdout in small batches.
pub(super) struct StdoutSink {
    buffer: String,
}

impl StdoutSink {
    pub(super) fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn flush(&mut self) -> Result<(), AssistantError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        print_blocking(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }
}

#[async_trait]
impl ReplySink for StdoutSink {
    async fn push_token(&mut self, token: &str) -> Result<(), AssistantError> {
        self.buffer.push_str(token);
        if self.buffer.len() >= STREAM_FLUSH_THRESHOLD {
            self.flush()?;
        }
        Ok(())
    }

    async fn end_reply(&mut self) -> Result<(), AssistantError> {
        self.buffer.push('\n');
        self.flush()
    }
}

pub(super) fn print_blocking(text: &str) -> Result<(), AssistantError> {
    let mut stdout = io::stdout();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|err| AssistantError::OutputError(err.to_string()))
}
