use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::builder::{FunctionBuilder, ParamBuilder};
use crate::chat::Tool;

/// Names of the functions the model may call.
pub const FUNCTION_NAMES: [&str; 6] = [
    "get_now_playing_movies",
    "get_showtimes",
    "get_random_movie",
    "get_reviews",
    "buy_ticket",
    "confirm_ticket_purchase",
];

/// Theater, movie and showtime of a ticket purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub theater: String,
    #[serde(deserialize_with = "string_or_number")]
    pub movie_id: String,
    pub showtime: String,
}

impl TicketRequest {
    pub fn new(
        theater: impl Into<String>,
        movie_id: impl Into<String>,
        showtime: impl Into<String>,
    ) -> Self {
        Self {
            theater: theater.into(),
            movie_id: movie_id.into(),
            showtime: showtime.into(),
        }
    }

    /// Whether both describe the same seat request, ignoring case and padding.
    pub fn same_ticket(&self, other: &TicketRequest) -> bool {
        fn eq(a: &str, b: &str) -> bool {
            a.trim().eq_ignore_ascii_case(b.trim())
        }
        eq(&self.theater, &other.theater)
            && eq(&self.movie_id, &other.movie_id)
            && eq(&self.showtime, &other.showtime)
    }

    pub(crate) fn not_drafted_message(&self) -> String {
        format!(
            "Ticket purchase for {} at {} ({}) has not been drafted and confirmed by the user yet. \
             Call buy_ticket and ask the user to confirm first.",
            self.movie_id, self.theater, self.showtime
        )
    }
}

/// A validated function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum MovieCall {
    GetNowPlayingMovies,
    GetShowtimes {
        title: String,
        location: String,
    },
    GetRandomMovie {
        #[serde(deserialize_with = "movie_list")]
        movies: String,
    },
    GetReviews {
        #[serde(deserialize_with = "string_or_number")]
        movie_id: String,
    },
    BuyTicket(TicketRequest),
    ConfirmTicketPurchase(TicketRequest),
    /// A function name outside [`FUNCTION_NAMES`].
    #[serde(skip)]
    Unknown { name: String },
}

impl MovieCall {
    /// Validates a call object of the form `{"function": "<name>", ...args}`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let name = match value.get("function") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(de::Error::custom("`function` must be a string")),
            None => return Err(de::Error::missing_field("function")),
        };
        if !FUNCTION_NAMES.contains(&name.as_str()) {
            return Ok(MovieCall::Unknown { name });
        }
        serde_json::from_value(value)
    }

    /// Validates a structured tool call: a function name plus its JSON argument string.
    pub fn from_tool_call(name: &str, arguments: &str) -> Result<Self, serde_json::Error> {
        let mut value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)?
        };
        match value.as_object_mut() {
            Some(object) => {
                object.insert("function".to_string(), Value::String(name.to_string()));
            }
            None => return Err(de::Error::custom("tool arguments must be a JSON object")),
        }
        Self::from_value(value)
    }

    pub fn name(&self) -> &str {
        match self {
            MovieCall::GetNowPlayingMovies => FUNCTION_NAMES[0],
            MovieCall::GetShowtimes { .. } => FUNCTION_NAMES[1],
            MovieCall::GetRandomMovie { .. } => FUNCTION_NAMES[2],
            MovieCall::GetReviews { .. } => FUNCTION_NAMES[3],
            MovieCall::BuyTicket(_) => FUNCTION_NAMES[4],
            MovieCall::ConfirmTicketPurchase(_) => FUNCTION_NAMES[5],
            MovieCall::Unknown { name } => name,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

fn movie_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(de::Error::custom(format!(
                    "expected a movie title, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|titles| titles.join(", ")),
        other => Err(de::Error::custom(format!(
            "expected a list of titles, got {other}"
        ))),
    }
}

/// Tool schemas for the six movie functions.
pub fn movie_tools() -> Vec<Tool> {
    let ticket = |name: &str, description: &str| {
        FunctionBuilder::new(name)
            .description(description)
            .param(ParamBuilder::new("theater").description("The movie theater."))
            .param(ParamBuilder::new("movie_id").description("The movie ID."))
            .param(
                ParamBuilder::new("showtime")
                    .description("The time the movie is showing at the selected theater."),
            )
            .required(["theater", "movie_id", "showtime"])
            .build()
    };

    vec![
        FunctionBuilder::new("get_now_playing_movies")
            .description(
                "Get movies that are in theaters now. Call this whenever you need to know what's playing now.",
            )
            .build(),
        FunctionBuilder::new("get_showtimes")
            .description("Get movie showtimes at specific locations.")
            .param(ParamBuilder::new("title").description("The movie's name or title."))
            .param(
                ParamBuilder::new("location")
                    .description("The location as a city, state or zipcode."),
            )
            .required(["title", "location"])
            .build(),
        FunctionBuilder::new("get_random_movie")
            .description("Select a random movie from a list of movie titles.")
            .param(ParamBuilder::new("movies").description("A list of movie titles."))
            .required(["movies"])
            .build(),
        FunctionBuilder::new("get_reviews")
            .description("Get reviews for a specific movie.")
            .param(ParamBuilder::new("movie_id").description("The movie ID."))
            .required(["movie_id"])
            .build(),
        ticket("buy_ticket", "To assist with ticket purchases."),
        ticket(
            "confirm_ticket_purchase",
            "To confirm with user before ticket purchases.",
        ),
    ]
}
