use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use rstest::rstest;

use crate::chat::{ChatMessage, ChatProvider, ChatRole, ChunkStream, StreamChunk, Tool};
use crate::conversation::Conversation;
use crate::dispatch::TicketRequest;
use crate::error::AssistantError;
use crate::movies::{Catalog, DataError, MovieData, TicketOutcome};
use crate::{FunctionCall, ToolCall};

use super::prompts::{REVIEW_PROMPT, SYSTEM_PROMPT};
use super::{BufferSink, DispatchConfig, Dispatcher};

enum Scripted {
    Text(&'static str),
    Tool(&'static str, &'static str),
    Fail,
}

#[derive(Clone)]
struct Request {
    messages: Vec<ChatMessage>,
    tools: usize,
}

/// Replays canned replies in order and records every request.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Scripted>) -> (Self, Arc<Mutex<Vec<Request>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let provider = Self {
            replies: Mutex::new(replies.into()),
            requests: Arc::clone(&requests),
        };
        (provider, requests)
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<ChunkStream, AssistantError> {
        self.requests.lock().expect("requests lock").push(Request {
            messages: messages.to_vec(),
            tools: tools.map_or(0, <[Tool]>::len),
        });
        let next = self.replies.lock().expect("replies lock").pop_front();
        let chunks = match next {
            Some(Scripted::Text(text)) => {
                let mid = text
                    .char_indices()
                    .nth(text.chars().count() / 2)
                    .map_or(text.len(), |(i, _)| i);
                let (head, tail) = text.split_at(mid);
                vec![
                    StreamChunk::Text(head.to_string()),
                    StreamChunk::Text(tail.to_string()),
                    StreamChunk::Done {
                        stop_reason: "stop".to_string(),
                    },
                ]
            }
            Some(Scripted::Tool(name, arguments)) => vec![
                StreamChunk::ToolUseStart {
                    index: 0,
                    id: "call_1".to_string(),
                    name: name.to_string(),
                },
                StreamChunk::ToolUseComplete {
                    index: 0,
                    tool_call: ToolCall {
                        id: "call_1".to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: name.to_string(),
                            arguments: arguments.to_string(),
                        },
                    },
                },
                StreamChunk::Done {
                    stop_reason: "tool_calls".to_string(),
                },
            ],
            Some(Scripted::Fail) => {
                return Err(AssistantError::HttpError("connection reset".to_string()))
            }
            None => return Err(AssistantError::ProviderError("script exhausted".to_string())),
        };
        Ok(Box::pin(stream::iter(
            chunks.into_iter().map(Ok::<_, AssistantError>),
        )))
    }
}

/// Answers every lookup with a label naming the call.
#[derive(Default)]
struct RecordingData {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingData {
    fn failing() -> Self {
        Self {
            calls: Mutex::default(),
            fail: true,
        }
    }

    fn record(&self, call: String) -> Result<String, DataError> {
        self.calls.lock().expect("calls lock").push(call.clone());
        if self.fail {
            return Err(DataError::Io(io::Error::other("catalog offline")));
        }
        Ok(format!("result of {call}"))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl MovieData for RecordingData {
    async fn get_now_playing_movies(&self) -> Result<String, DataError> {
        self.record("get_now_playing_movies()".to_string())
    }

    async fn get_showtimes(&self, title: &str, location: &str) -> Result<String, DataError> {
        self.record(format!("get_showtimes({title}|{location})"))
    }

    async fn get_random_movie(&self, movies: &str) -> Result<String, DataError> {
        self.record(format!("get_random_movie({movies})"))
    }

    async fn get_reviews(&self, movie_id: &str) -> Result<String, DataError> {
        self.record(format!("get_reviews({movie_id})"))
    }

    async fn buy_ticket(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError> {
        self.record(format!("buy_ticket({theater}|{movie_id}|{showtime})"))
            .map(TicketOutcome::Accepted)
    }

    async fn confirm_ticket_purchase(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError> {
        self.record(format!(
            "confirm_ticket_purchase({theater}|{movie_id}|{showtime})"
        ))
        .map(TicketOutcome::Accepted)
    }
}

struct Harness<D = RecordingData> {
    dispatcher: Dispatcher,
    data: Arc<D>,
    requests: Arc<Mutex<Vec<Request>>>,
    conversation: Conversation,
}

impl Harness {
    fn new(config: DispatchConfig, replies: Vec<Scripted>) -> Self {
        Self::with_data(config, replies, RecordingData::default())
    }
}

impl Harness<Catalog> {
    fn with_catalog(replies: Vec<Scripted>) -> Self {
        let catalog = Catalog::bundled().expect("bundled catalog parses");
        Self::with_data(DispatchConfig::looping(), replies, catalog)
    }
}

impl<D: MovieData + 'static> Harness<D> {
    fn with_data(config: DispatchConfig, replies: Vec<Scripted>, data: D) -> Self {
        let (provider, requests) = ScriptedProvider::new(replies);
        let data = Arc::new(data);
        let dispatcher = Dispatcher::new(Arc::new(provider), data.clone() as Arc<dyn MovieData>, config);
        let conversation = dispatcher.new_conversation();
        Self {
            dispatcher,
            data,
            requests,
            conversation,
        }
    }

    async fn send(&mut self, text: &str) -> Result<ChatMessage, AssistantError> {
        let mut sink = BufferSink::new();
        self.dispatcher
            .handle_message(&mut self.conversation, text, &mut sink)
            .await
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    fn roles(&self) -> Vec<ChatRole> {
        self.conversation.messages().iter().map(|m| m.role).collect()
    }

    fn system_results(&self) -> Vec<String> {
        self.conversation.messages()[1..]
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.clone())
            .collect()
    }
}

const SHOWTIMES_CALL: &str =
    r#"{"function": "get_showtimes", "title": "Dune", "location": "Austin, TX"}"#;

#[tokio::test]
async fn plain_answer_appends_user_and_assistant() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![Scripted::Text("Dune: Part Two is great fun.")],
    );
    let mut sink = BufferSink::new();

    let answer = harness
        .dispatcher
        .handle_message(&mut harness.conversation, "Anything good out?", &mut sink)
        .await
        .unwrap();

    assert_eq!(answer.content, "Dune: Part Two is great fun.");
    assert_eq!(sink.replies(), ["Dune: Part Two is great fun."]);
    assert_eq!(
        harness.roles(),
        vec![ChatRole::System, ChatRole::User, ChatRole::Assistant]
    );
    assert_eq!(harness.conversation.messages()[1].content, "Anything good out?");
    assert!(harness.data.calls().is_empty());
}

#[tokio::test]
async fn empty_message_is_accepted() {
    let mut harness = Harness::new(DispatchConfig::looping(), vec![Scripted::Text("Hi!")]);
    harness.send("").await.unwrap();
    assert_eq!(harness.conversation.messages()[1].content, "");
}

#[tokio::test]
async fn showtimes_call_reaches_data_and_next_request() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(SHOWTIMES_CALL),
            Scripted::Text("Dune plays at 8:00 PM."),
        ],
    );

    let answer = harness.send("When is Dune on in Austin?").await.unwrap();

    assert_eq!(answer.content, "Dune plays at 8:00 PM.");
    assert_eq!(harness.data.calls(), ["get_showtimes(Dune|Austin, TX)"]);
    let requests = harness.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1]
        .messages
        .iter()
        .any(|m| m.is_system() && m.content == "result of get_showtimes(Dune|Austin, TX)"));

    let roles = harness.roles();
    assert_eq!(roles.iter().filter(|r| **r == ChatRole::User).count(), 1);
    assert_eq!(roles.iter().filter(|r| **r == ChatRole::Assistant).count(), 1);
    assert_eq!(roles.last(), Some(&ChatRole::Assistant));
}

#[tokio::test]
async fn reanchoring_never_grows_the_log() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text("One."),
            Scripted::Text("Two."),
            Scripted::Text("Three."),
        ],
    );

    for text in ["first", "second", "third"] {
        harness.send(text).await.unwrap();
    }

    let anchors = harness
        .conversation
        .messages()
        .iter()
        .filter(|m| m.content == SYSTEM_PROMPT)
        .count();
    assert_eq!(anchors, 1);
    assert_eq!(harness.conversation.messages().len(), 7);
    for request in harness.requests() {
        let last = request.messages.last().unwrap();
        assert_eq!(last.role, ChatRole::System);
        assert_eq!(last.content, SYSTEM_PROMPT);
        assert_eq!(request.tools, 0);
    }
}

#[tokio::test]
async fn malformed_call_is_the_answer() {
    let raw = r#"{ "function": "get_showtimes", title: Dune }"#;
    let mut harness = Harness::new(DispatchConfig::looping(), vec![Scripted::Text(raw)]);

    let answer = harness.send("Dune times?").await.unwrap();

    assert_eq!(answer.content, raw);
    assert!(harness.data.calls().is_empty());
    assert_eq!(harness.requests().len(), 1);
}

#[tokio::test]
async fn unknown_function_is_reported_to_the_model() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(r#"{"function": "launch_rocket", "target": "moon"}"#),
            Scripted::Text("I can't do that."),
        ],
    );

    harness.send("Launch!").await.unwrap();

    assert_eq!(harness.system_results(), ["Unknown function call: launch_rocket"]);
    assert!(harness.data.calls().is_empty());
}

#[tokio::test]
async fn looping_chains_calls() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(r#"{"function": "get_now_playing_movies"}"#),
            Scripted::Text(r#"{"function": "get_reviews", "movie_id": 693134}"#),
            Scripted::Text("Critics love Dune."),
        ],
    );

    let answer = harness.send("What's the best movie out?").await.unwrap();

    assert_eq!(answer.content, "Critics love Dune.");
    assert_eq!(
        harness.data.calls(),
        ["get_now_playing_movies()", "get_reviews(693134)"]
    );
    assert_eq!(harness.system_results().len(), 2);
}

#[tokio::test]
async fn looping_stops_at_round_limit() {
    let call = r#"{"function": "get_now_playing_movies"}"#;
    let mut harness = Harness::new(
        DispatchConfig::looping().with_max_function_rounds(2),
        vec![
            Scripted::Text(call),
            Scripted::Text(call),
            Scripted::Text(call),
        ],
    );

    let answer = harness.send("Loop forever").await.unwrap();

    assert_eq!(harness.data.calls().len(), 2);
    assert_eq!(answer.content, call);
}

#[tokio::test]
async fn single_shot_dispatches_only_first_call() {
    let second = r#"{"function": "get_reviews", "movie_id": "693134"}"#;
    let mut harness = Harness::new(
        DispatchConfig::review_prefetch(),
        vec![
            Scripted::Text(r#"{"movie": "", "id": null, "fetch_reviews": false, "rationale": "general question"}"#),
            Scripted::Text(r#"{"function": "get_now_playing_movies"}"#),
            Scripted::Text(second),
        ],
    );

    let answer = harness.send("What's the best movie out?").await.unwrap();

    assert_eq!(harness.data.calls(), ["get_now_playing_movies()"]);
    assert_eq!(answer.content, second);
}

#[tokio::test]
async fn prefetch_adds_review_context() {
    let mut harness = Harness::new(
        DispatchConfig::review_prefetch(),
        vec![
            Scripted::Text(r#"{"movie": "Dune: Part Two", "id": 693134, "fetch_reviews": true, "rationale": "asks about critics"}"#),
            Scripted::Text("Critics call it huge."),
        ],
    );
    let mut sink = BufferSink::new();

    harness
        .dispatcher
        .handle_message(&mut harness.conversation, "Is Dune any good?", &mut sink)
        .await
        .unwrap();

    assert_eq!(harness.data.calls(), ["get_reviews(693134)"]);
    assert_eq!(sink.replies(), ["Critics call it huge."]);
    let context = "CONTEXT: Reviews for Dune: Part Two (ID: 693134):\n\nresult of get_reviews(693134)";
    assert_eq!(harness.system_results(), [context]);

    let requests = harness.requests();
    assert_eq!(requests[0].messages.last().unwrap().content, REVIEW_PROMPT);
    assert!(requests[1].messages.iter().any(|m| m.content == context));
    assert!(requests[1].messages.iter().all(|m| m.content != REVIEW_PROMPT));
    assert!(harness
        .conversation
        .messages()
        .iter()
        .all(|m| m.content != REVIEW_PROMPT));
}

#[tokio::test]
async fn unparsable_review_decision_is_skipped() {
    let mut harness = Harness::new(
        DispatchConfig::review_prefetch(),
        vec![
            Scripted::Text("Sure, let me think about reviews."),
            Scripted::Text("Here is what I know."),
        ],
    );

    let answer = harness.send("Is Dune any good?").await.unwrap();

    assert_eq!(answer.content, "Here is what I know.");
    assert!(harness.data.calls().is_empty());
    assert!(harness.system_results().is_empty());
}

#[tokio::test]
async fn data_failure_aborts_turn_without_changes() {
    let mut harness = Harness::with_data(
        DispatchConfig::looping(),
        vec![
            Scripted::Text("Hello!"),
            Scripted::Text(SHOWTIMES_CALL),
        ],
        RecordingData::failing(),
    );
    harness.send("hi").await.unwrap();
    let before = harness.conversation.messages().to_vec();

    let err = harness.send("When is Dune on?").await.unwrap_err();

    assert!(matches!(
        err,
        AssistantError::DataFunction { ref function, .. } if function == "get_showtimes"
    ));
    assert_eq!(harness.conversation.messages(), before.as_slice());
    assert_eq!(harness.conversation.turns(), 1);
}

#[tokio::test]
async fn transport_failure_aborts_turn_without_changes() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![Scripted::Text(SHOWTIMES_CALL), Scripted::Fail],
    );

    let err = harness.send("When is Dune on?").await.unwrap_err();

    assert!(matches!(err, AssistantError::HttpError(_)));
    assert_eq!(harness.conversation.messages().len(), 1);
    assert_eq!(harness.data.calls(), ["get_showtimes(Dune|Austin, TX)"]);
}

const BUY: &str = r#"{"function": "buy_ticket", "theater": "Cinerama", "movie_id": 718821, "showtime": "9:30 PM"}"#;
const CONFIRM: &str = r#"{"function": "confirm_ticket_purchase", "theater": "Cinerama", "movie_id": "718821", "showtime": "9:30 PM"}"#;

#[tokio::test]
async fn confirmation_without_draft_is_held_back() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![Scripted::Text(CONFIRM), Scripted::Text("Let me draft that first.")],
    );

    harness.send("Buy Twisters at Cinerama 9:30").await.unwrap();

    assert!(harness.data.calls().is_empty());
    assert_eq!(
        harness.system_results(),
        ["Ticket purchase for 718821 at Cinerama (9:30 PM) has not been drafted and confirmed by the user yet. Call buy_ticket and ask the user to confirm first."]
    );
}

#[tokio::test]
async fn confirmation_in_drafting_turn_is_held_back() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(BUY),
            Scripted::Text(CONFIRM),
            Scripted::Text("Please confirm."),
        ],
    );

    harness.send("Buy Twisters at Cinerama 9:30").await.unwrap();

    assert_eq!(harness.data.calls(), ["buy_ticket(Cinerama|718821|9:30 PM)"]);
    assert!(harness.conversation.pending_ticket().is_some());
}

#[tokio::test]
async fn confirmation_after_user_reply_is_forwarded() {
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(BUY),
            Scripted::Text("1 ticket for Twisters at Cinerama, 9:30 PM. Confirm?"),
            Scripted::Text(CONFIRM),
            Scripted::Text("You're all set."),
            Scripted::Text(CONFIRM),
            Scripted::Text("Already done."),
        ],
    );

    harness.send("Buy Twisters at Cinerama 9:30").await.unwrap();
    harness.send("Yes, confirm").await.unwrap();

    assert_eq!(
        harness.data.calls(),
        [
            "buy_ticket(Cinerama|718821|9:30 PM)",
            "confirm_ticket_purchase(Cinerama|718821|9:30 PM)"
        ]
    );
    assert!(harness.conversation.pending_ticket().is_none());

    harness.send("Confirm again").await.unwrap();
    assert_eq!(harness.data.calls().len(), 2);
}

#[tokio::test]
async fn tools_preset_offers_schemas_and_dispatches_tool_calls() {
    let mut harness = Harness::new(
        DispatchConfig::tools(),
        vec![
            Scripted::Tool("get_showtimes", r#"{"title":"Dune","location":"Austin, TX"}"#),
            Scripted::Text("Dune plays at 8:00 PM."),
        ],
    );

    let answer = harness.send("When is Dune on in Austin?").await.unwrap();

    assert_eq!(answer.content, "Dune plays at 8:00 PM.");
    assert_eq!(harness.data.calls(), ["get_showtimes(Dune|Austin, TX)"]);
    let requests = harness.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.tools, 6);
        assert_ne!(request.messages.last().unwrap().content, harness.conversation.system_prompt());
    }
    assert_eq!(requests[0].messages.last().unwrap().role, ChatRole::User);
    assert_eq!(
        requests[0]
            .messages
            .iter()
            .filter(|m| m.is_system())
            .count(),
        1
    );
}

#[tokio::test]
async fn tools_preset_ignores_text_sentinel() {
    let mut harness = Harness::new(
        DispatchConfig::tools(),
        vec![Scripted::Text(r#"{ "function": "get_now_playing_movies"}"#)],
    );

    let answer = harness.send("What's on?").await.unwrap();

    assert!(harness.data.calls().is_empty());
    assert_eq!(answer.content, r#"{ "function": "get_now_playing_movies"}"#);
}

#[rstest]
#[case(r#"{"function": "get_random_movie", "movies": []}"#, "No movie titles were given")]
#[case(
    r#"{"function": "get_showtimes", "title": "", "location": "Austin, TX"}"#,
    "The title argument was empty."
)]
#[tokio::test]
async fn blank_arguments_are_explained_to_the_model(
    #[case] call: &'static str,
    #[case] explanation: &str,
) {
    let mut harness = Harness::with_catalog(vec![
        Scripted::Text(call),
        Scripted::Text("Which movies should I pick from?"),
    ]);

    let answer = harness.send("Pick something for me").await.unwrap();

    assert_eq!(answer.content, "Which movies should I pick from?");
    let results = harness.system_results();
    assert_eq!(results.len(), 1);
    assert!(results[0].starts_with(explanation), "{}", results[0]);
    assert_eq!(harness.conversation.turns(), 1);
    assert_eq!(
        harness.roles(),
        vec![ChatRole::System, ChatRole::User, ChatRole::System, ChatRole::Assistant]
    );
}

#[tokio::test]
async fn rejected_purchase_is_not_drafted() {
    let buy = r#"{"function": "buy_ticket", "theater": "Nowhere Cinema", "movie_id": "999", "showtime": "25:00"}"#;
    let confirm = r#"{"function": "confirm_ticket_purchase", "theater": "Nowhere Cinema", "movie_id": "999", "showtime": "25:00"}"#;
    let mut harness = Harness::with_catalog(vec![
        Scripted::Text(buy),
        Scripted::Text("That showing doesn't exist."),
        Scripted::Text(confirm),
        Scripted::Text("I can't confirm that."),
    ]);

    harness.send("Buy a ticket at Nowhere Cinema").await.unwrap();

    assert_eq!(harness.system_results(), ["No movie with ID 999 is playing."]);
    assert!(harness.conversation.pending_ticket().is_none());

    harness.send("Yes, confirm it").await.unwrap();

    assert_eq!(
        harness.system_results().last().map(String::as_str),
        Some(
            "Ticket purchase for 999 at Nowhere Cinema (25:00) has not been drafted and confirmed \
             by the user yet. Call buy_ticket and ask the user to confirm first."
        )
    );
}

#[tokio::test]
async fn new_draft_survives_confirming_the_previous_one() {
    let buy_dune = r#"{"function": "buy_ticket", "theater": "Cinerama", "movie_id": "693134", "showtime": "7:00 PM"}"#;
    let mut harness = Harness::new(
        DispatchConfig::looping(),
        vec![
            Scripted::Text(BUY),
            Scripted::Text("1 ticket for Twisters at Cinerama, 9:30 PM. Confirm?"),
            Scripted::Text(buy_dune),
            Scripted::Text(CONFIRM),
            Scripted::Text("Twisters is booked. Confirm Dune at 7:00 PM too?"),
        ],
    );

    harness.send("Buy Twisters at Cinerama 9:30").await.unwrap();
    harness.send("Yes, and Dune at 7 as well").await.unwrap();

    assert_eq!(
        harness.data.calls(),
        [
            "buy_ticket(Cinerama|718821|9:30 PM)",
            "buy_ticket(Cinerama|693134|7:00 PM)",
            "confirm_ticket_purchase(Cinerama|718821|9:30 PM)"
        ]
    );
    assert_eq!(
        harness.conversation.pending_ticket(),
        Some(&TicketRequest::new("Cinerama", "693134", "7:00 PM"))
    );
}
