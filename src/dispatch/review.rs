use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// The model's verdict on whether reviews should be fetched before answering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReviewDecision {
    pub movie: String,
    #[serde(deserialize_with = "optional_id")]
    pub id: Option<String>,
    pub fetch_reviews: bool,
    pub rationale: String,
}

impl ReviewDecision {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text.trim())
    }

    /// Movie id to fetch, when the decision asks for reviews.
    pub fn movie_id(&self) -> Option<&str> {
        if !self.fetch_reviews {
            return None;
        }
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// System message carrying the fetched reviews.
    pub fn context_message(&self, movie_id: &str, reviews: &str) -> String {
        format!(
            "CONTEXT: Reviews for {} (ID: {}):\n\n{}",
            self.movie, movie_id, reviews
        )
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("invalid movie id: {other}"))),
    }
}
