use crate::chat::ChatMessage;
use crate::dispatch::TicketRequest;

/// Ticket changes made during a turn. A turn may confirm the earlier draft
/// and draft a new ticket; both apply on commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct TicketUpdate {
    drafted: Option<TicketRequest>,
    confirmed: bool,
}

impl TicketUpdate {
    /// Applies the changes to the committed draft slot.
    pub(super) fn apply(self, pending: &mut Option<TicketRequest>) {
        if self.confirmed {
            *pending = None;
        }
        if let Some(request) = self.drafted {
            *pending = Some(request);
        }
    }
}

/// Scratch copy of a conversation for the duration of one turn.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    messages: Vec<ChatMessage>,
    committed_ticket: Option<TicketRequest>,
    ticket: TicketUpdate,
}

impl ConversationTurn {
    pub(super) fn new(messages: Vec<ChatMessage>, committed_ticket: Option<TicketRequest>) -> Self {
        Self {
            messages,
            committed_ticket,
            ticket: TicketUpdate::default(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Records a `buy_ticket` draft; it becomes confirmable from the next turn.
    pub fn draft_ticket(&mut self, request: TicketRequest) {
        self.ticket.drafted = Some(request);
    }

    /// The earlier-turn draft matching `request`, if any.
    pub fn confirmable(&self, request: &TicketRequest) -> Option<&TicketRequest> {
        if self.ticket.confirmed {
            return None;
        }
        self.committed_ticket
            .as_ref()
            .filter(|draft| draft.same_ticket(request))
    }

    pub fn confirm_ticket(&mut self) {
        self.ticket.confirmed = true;
    }

    pub(super) fn into_parts(self, committed_len: usize) -> (Vec<ChatMessage>, TicketUpdate) {
        let mut messages = self.messages;
        let appended = messages.split_off(committed_len.min(messages.len()));
        (appended, self.ticket)
    }
}
