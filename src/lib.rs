//! cinebot is a conversational movie-information assistant.
//!
//! A user message goes to a chat-completion model; when the model asks for
//! one of the movie lookups (showtimes, now playing, reviews, random pick,
//! ticket purchase and confirmation) the [`dispatch::Dispatcher`] runs it and
//! feeds the result back into the conversation before the final answer.
//!
//! # Modules
//! - [`chat`]: messages, tool schemas and the streaming [`chat::ChatProvider`] trait
//! - [`backends`]: the OpenAI chat-completions client
//! - [`movies`]: the [`movies::MovieData`] lookups and a bundled catalog
//! - [`conversation`]: per-session conversation state and the session store
//! - [`dispatch`]: call detection and the turn loop

// Re-export for convenience
pub use async_trait::async_trait;

use serde::{Deserialize, Serialize};

/// Model client implementations.
pub mod backends;

/// Builders for function tool schemas.
pub mod builder;

/// Chat messages, tools and the provider trait.
pub mod chat;

/// Conversation state and session store.
pub mod conversation;

/// Function-call detection and the dispatch loop.
pub mod dispatch;

/// Error types and handling
pub mod error;

/// Movie data lookups.
pub mod movies;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Tool call represents a function call that the model wants to make.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct ToolCall {
    /// The ID of the tool call.
    pub id: String,
    /// The type of the tool call (usually "function").
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

/// FunctionCall contains details about which function to call and with what arguments.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct FunctionCall {
    /// The name of the function to call.
    pub name: String,
    /// The arguments to pass to the function, serialized as a JSON string.
    pub arguments: String,
}
