use std::marker::PhantomData;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

use crate::error::AssistantError;

const SSE_DELIMITER: &str = "\n\n";

/// Turns server-sent events into values.
///
/// Parsers are stateful so they can assemble values that span events, such
/// as tool-call arguments streamed in fragments.
pub(crate) trait SseParser<T>: Send {
    fn parse_event(&mut self, event: &str) -> Result<Vec<T>, AssistantError>;

    /// Called once after the body ends, to flush anything still buffered.
    fn end_of_stream(&mut self) -> Vec<T> {
        Vec::new()
    }
}

impl<T, F> SseParser<T> for F
where
    F: FnMut(&str) -> Result<Vec<T>, AssistantError> + Send,
{
    fn parse_event(&mut self, event: &str) -> Result<Vec<T>, AssistantError> {
        self(event)
    }
}

/// Splits a server-sent-event body into events and hands each to `parser`.
///
/// A trailing event without a closing blank line is still parsed once the
/// body ends, followed by [`SseParser::end_of_stream`].
pub(crate) fn create_sse_stream<T, P>(
    response: reqwest::Response,
    parser: P,
) -> Pin<Box<dyn Stream<Item = Result<T, AssistantError>> + Send>>
where
    T: Send + 'static,
    P: SseParser<T> + 'static,
{
    let stream = response
        .bytes_stream()
        .map(Some)
        .chain(futures::stream::once(async { None }))
        .scan(SseState::new(parser), |state, chunk| {
            let results = match chunk {
                Some(chunk) => state.handle_chunk(chunk),
                None => state.finish(),
            };
            async move { Some(results) }
        })
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}

struct SseState<T, P> {
    buffer: String,
    utf8_buffer: Vec<u8>,
    parser: P,
    _values: PhantomData<fn() -> T>,
}

impl<T, P> SseState<T, P>
where
    P: SseParser<T>,
{
    fn new(parser: P) -> Self {
        Self {
            buffer: String::new(),
            utf8_buffer: Vec::new(),
            parser,
            _values: PhantomData,
        }
    }

    fn handle_chunk(
        &mut self,
        chunk: Result<Bytes, reqwest::Error>,
    ) -> Vec<Result<T, AssistantError>> {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => return vec![Err(AssistantError::HttpError(err.to_string()))],
        };

        self.push_bytes(&bytes);
        self.drain_events()
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buffer.extend_from_slice(bytes);
        match std::str::from_utf8(&self.utf8_buffer) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.utf8_buffer.clear();
            }
            Err(err) => self.consume_valid_prefix(err.valid_up_to()),
        }
    }

    fn consume_valid_prefix(&mut self, valid_up_to: usize) {
        if valid_up_to == 0 {
            return;
        }

        let valid = String::from_utf8_lossy(&self.utf8_buffer[..valid_up_to]);
        self.buffer.push_str(&valid);
        self.utf8_buffer.drain(..valid_up_to);
    }

    fn drain_events(&mut self) -> Vec<Result<T, AssistantError>> {
        let mut results = Vec::new();
        while let Some(event) = self.next_event() {
            self.parse_into(&event, &mut results);
        }
        results
    }

    fn finish(&mut self) -> Vec<Result<T, AssistantError>> {
        let mut results = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        if !rest.trim().is_empty() {
            self.parse_into(&format!("{rest}{SSE_DELIMITER}"), &mut results);
        }
        results.extend(self.parser.end_of_stream().into_iter().map(Ok));
        results
    }

    fn parse_into(&mut self, event: &str, results: &mut Vec<Result<T, AssistantError>>) {
        match self.parser.parse_event(event) {
            Ok(values) => results.extend(values.into_iter().map(Ok)),
            Err(err) => results.push(Err(err)),
        }
    }

    fn next_event(&mut self) -> Option<String> {
        let pos = self.buffer.find(SSE_DELIMITER)?;
        let end = pos + SSE_DELIMITER.len();
        let event = self.buffer[..end].to_string();
        self.buffer.drain(..end);
        Some(event)
    }
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
