mod message;
mod options;
mod sse;
mod stream;
mod tool;
mod traits;

pub use message::{ChatMessage, ChatMessageBuilder, ChatRole};
pub use options::GenerationOptions;
pub use stream::StreamChunk;
pub use tool::{FunctionTool, ParameterProperty, ParametersSchema, Tool, ToolChoice};
pub use traits::{ChatProvider, ChunkStream, TextStream};

pub(crate) use sse::{create_sse_stream, SseParser};
