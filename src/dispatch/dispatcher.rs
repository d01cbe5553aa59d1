use std::sync::Arc;

use futures::StreamExt;
use log::{debug, log_enabled, trace, warn};

use crate::chat::{ChatMessage, ChatProvider, StreamChunk, Tool};
use crate::conversation::{Conversation, ConversationTurn};
use crate::error::AssistantError;
use crate::movies::MovieData;

use super::call::{movie_tools, MovieCall};
use super::config::DispatchConfig;
use super::detect::{Detection, ModelReply};
use super::prompts::REVIEW_PROMPT;
use super::review::ReviewDecision;
use super::sink::ReplySink;

/// Runs conversation turns: model calls, call detection and data lookups.
pub struct Dispatcher {
    provider: Arc<dyn ChatProvider>,
    data: Arc<dyn MovieData>,
    config: DispatchConfig,
    tools: Vec<Tool>,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        data: Arc<dyn MovieData>,
        config: DispatchConfig,
    ) -> Self {
        let tools = if config.detector.offers_tools() {
            movie_tools()
        } else {
            Vec::new()
        };
        Self {
            provider,
            data,
            config,
            tools,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// A fresh conversation seeded with this dispatcher's system instruction.
    pub fn new_conversation(&self) -> Conversation {
        Conversation::new(self.config.system_prompt())
    }

    /// Runs one turn and returns the final assistant message.
    ///
    /// On error `conversation` is left exactly as it was.
    pub async fn handle_message(
        &self,
        conversation: &mut Conversation,
        text: &str,
        sink: &mut dyn ReplySink,
    ) -> Result<ChatMessage, AssistantError> {
        let mut turn = conversation.begin_turn();
        turn.push(ChatMessage::user().content(text).build());

        if self.config.review_prefetch {
            self.prefetch_reviews(&mut turn).await?;
        }

        let mut reply = self.generate(&turn, sink).await?;
        let mut rounds = 0;
        loop {
            let call = match self.config.detector.detect(&reply) {
                Detection::None => break,
                Detection::Malformed(reason) => {
                    warn!("Ignoring malformed function call: {reason}");
                    break;
                }
                Detection::Call(call) => call,
            };
            if rounds == self.config.max_function_rounds {
                if self.config.max_function_rounds > 1 {
                    warn!(
                        "Function call limit of {} reached, answering with the last reply",
                        self.config.max_function_rounds
                    );
                } else {
                    debug!("Not dispatching chained call to {}", call.name());
                }
                break;
            }
            rounds += 1;

            debug!(
                "Dispatching {} (round {}/{})",
                call.name(),
                rounds,
                self.config.max_function_rounds
            );
            let result = self.invoke(&call, &mut turn).await?;
            turn.push(ChatMessage::system().content(result).build());
            reply = self.generate(&turn, sink).await?;
        }

        let answer = ChatMessage::assistant().content(reply.text).build();
        turn.push(answer.clone());
        conversation.commit(turn);
        Ok(answer)
    }

    async fn prefetch_reviews(&self, turn: &mut ConversationTurn) -> Result<(), AssistantError> {
        let mut request = turn.messages().to_vec();
        request.push(ChatMessage::system().content(REVIEW_PROMPT).build());
        let reply = self.complete(&request, None, None).await?;

        let decision = match ReviewDecision::parse(&reply.text) {
            Ok(decision) => decision,
            Err(err) => {
                warn!("Unable to parse review decision as JSON ({err}): {}", reply.text);
                return Ok(());
            }
        };
        debug!(
            "Review decision for {:?}: fetch={} ({})",
            decision.movie, decision.fetch_reviews, decision.rationale
        );

        let Some(movie_id) = decision.movie_id() else {
            if decision.fetch_reviews {
                warn!("Review decision asked for reviews without a movie id");
            }
            return Ok(());
        };
        let reviews = self.data.get_reviews(movie_id).await.map_err(|source| {
            AssistantError::DataFunction {
                function: "get_reviews".to_string(),
                source,
            }
        })?;
        turn.push(
            ChatMessage::system()
                .content(decision.context_message(movie_id, &reviews))
                .build(),
        );
        Ok(())
    }

    async fn generate(
        &self,
        turn: &ConversationTurn,
        sink: &mut dyn ReplySink,
    ) -> Result<ModelReply, AssistantError> {
        let mut request = turn.messages().to_vec();
        if self.config.reanchor_system {
            if let Some(system) = request.first().filter(|m| m.is_system()).cloned() {
                request.push(system);
            }
        }
        let tools = self.config.detector.offers_tools().then_some(self.tools.as_slice());

        sink.begin_reply().await?;
        let reply = self.complete(&request, tools, Some(&mut *sink)).await?;
        sink.end_reply().await?;
        Ok(reply)
    }

    async fn complete(
        &self,
        request: &[ChatMessage],
        tools: Option<&[Tool]>,
        mut sink: Option<&mut dyn ReplySink>,
    ) -> Result<ModelReply, AssistantError> {
        if log_enabled!(log::Level::Trace) {
            trace!("Model request: {} messages", request.len());
        }
        let mut stream = self.provider.chat_stream_with_tools(request, tools).await?;
        let mut reply = ModelReply::default();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Text(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.push_token(&delta).await?;
                    }
                    reply.text.push_str(&delta);
                }
                StreamChunk::ToolUseComplete { tool_call, .. } => reply.tool_calls.push(tool_call),
                StreamChunk::Done { stop_reason } => {
                    debug!("Model reply finished: {stop_reason}");
                }
                StreamChunk::ToolUseStart { .. } | StreamChunk::ToolUseInputDelta { .. } => {}
            }
        }
        Ok(reply)
    }

    async fn invoke(
        &self,
        call: &MovieCall,
        turn: &mut ConversationTurn,
    ) -> Result<String, AssistantError> {
        let data = self.data.as_ref();
        let result = match call {
            MovieCall::GetNowPlayingMovies => data.get_now_playing_movies().await,
            MovieCall::GetShowtimes { title, location } => {
                data.get_showtimes(title, location).await
            }
            MovieCall::GetRandomMovie { movies } => data.get_random_movie(movies).await,
            MovieCall::GetReviews { movie_id } => data.get_reviews(movie_id).await,
            MovieCall::BuyTicket(ticket) => data
                .buy_ticket(&ticket.theater, &ticket.movie_id, &ticket.showtime)
                .await
                .map(|outcome| {
                    if outcome.is_accepted() {
                        turn.draft_ticket(ticket.clone());
                    } else {
                        debug!("Ticket draft for {} was rejected", ticket.movie_id);
                    }
                    outcome.into_text()
                }),
            MovieCall::ConfirmTicketPurchase(ticket) => {
                if turn.confirmable(ticket).is_none() {
                    debug!("Holding back unconfirmed ticket purchase for {}", ticket.movie_id);
                    return Ok(ticket.not_drafted_message());
                }
                data.confirm_ticket_purchase(&ticket.theater, &ticket.movie_id, &ticket.showtime)
                    .await
                    .map(|outcome| {
                        if outcome.is_accepted() {
                            turn.confirm_ticket();
                        }
                        outcome.into_text()
                    })
            }
            MovieCall::Unknown { name } => {
                debug!("Model called unknown function {name}");
                return Ok(format!("Unknown function call: {name}"));
            }
        };
        result.map_err(|source| AssistantError::DataFunction {
            function: call.name().to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}
