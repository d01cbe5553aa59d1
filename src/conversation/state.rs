use chrono::{DateTime, Utc};

use crate::chat::ChatMessage;
use crate::dispatch::TicketRequest;

use super::id::SessionId;
use super::turn::ConversationTurn;

/// Message log of one chat session.
///
/// The first message is always the system instruction. The log only grows:
/// a turn works on a [`ConversationTurn`] copy and its messages are appended
/// here in one step when the turn completes.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    pending_ticket: Option<TicketRequest>,
    turns: u64,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_id(SessionId::new(), system_prompt)
    }

    pub fn with_id(id: SessionId, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            messages: vec![ChatMessage::system().content(system_prompt).build()],
            pending_ticket: None,
            turns: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    /// Number of completed turns.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Ticket drafted by `buy_ticket` in an earlier turn and not yet confirmed.
    pub fn pending_ticket(&self) -> Option<&TicketRequest> {
        self.pending_ticket.as_ref()
    }

    pub fn begin_turn(&self) -> ConversationTurn {
        ConversationTurn::new(self.messages.clone(), self.pending_ticket.clone())
    }

    /// Appends everything the turn produced and applies its ticket changes.
    pub fn commit(&mut self, turn: ConversationTurn) {
        let (appended, ticket) = turn.into_parts(self.messages.len());
        self.messages.extend(appended);
        ticket.apply(&mut self.pending_ticket);
        self.turns += 1;
        self.updated_at = Utc::now();
    }
}
