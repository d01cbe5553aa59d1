use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::{Mutex, RwLock};

use crate::chat::ChatMessage;
use crate::dispatch::{Dispatcher, ReplySink};
use crate::error::AssistantError;

use super::id::SessionId;
use super::state::Conversation;

type SharedConversation = Arc<Mutex<Conversation>>;

/// Live sessions keyed by id.
///
/// Turns of one session run one at a time; different sessions proceed
/// independently.
#[derive(Debug)]
pub struct SessionStore {
    dispatcher: Arc<Dispatcher>,
    sessions: RwLock<HashMap<SessionId, SharedConversation>>,
}

impl SessionStore {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Opens a session holding only the system instruction.
    pub async fn start(&self) -> SessionId {
        let conversation = self.dispatcher.new_conversation();
        let id = conversation.id;
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(conversation)));
        debug!("Started session {id}");
        id
    }

    /// Drops a session and its conversation.
    pub async fn end(&self, id: SessionId) -> Result<(), AssistantError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                debug!("Ended session {id}");
                Ok(())
            }
            None => Err(AssistantError::SessionNotFound(id.to_string())),
        }
    }

    pub async fn handle_message(
        &self,
        id: SessionId,
        text: &str,
        sink: &mut dyn ReplySink,
    ) -> Result<ChatMessage, AssistantError> {
        let conversation = self.session(id).await?;
        let mut conversation = conversation.lock().await;
        self.dispatcher
            .handle_message(&mut conversation, text, sink)
            .await
    }

    /// Copy of a session's conversation.
    pub async fn snapshot(&self, id: SessionId) -> Result<Conversation, AssistantError> {
        let conversation = self.session(id).await?;
        let conversation = conversation.lock().await;
        Ok(conversation.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn session(&self, id: SessionId) -> Result<SharedConversation, AssistantError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AssistantError::SessionNotFound(id.to_string()))
    }
}
