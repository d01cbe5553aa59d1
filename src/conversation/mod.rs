//! Per-session conversation state.

mod id;
mod state;
mod store;
mod turn;

pub use id::SessionId;
pub use state::Conversation;
pub use store::SessionStore;
pub use turn::ConversationTurn;
