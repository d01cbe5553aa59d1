//! The six movie lookups the assistant can call, and a catalog that serves them.

mod catalog;
mod error;

pub use catalog::{Catalog, CatalogData, Movie, Review, Showing, Theater};
pub use error::DataError;

use async_trait::async_trait;

/// Lookups the model can request through function calls.
///
/// Every operation takes plain string arguments and answers with text that
/// is handed back to the model verbatim. Blank or unknown arguments are
/// answered with text too; errors are reserved for the data source failing.
#[async_trait]
pub trait MovieData: Send + Sync {
    /// Titles currently in theaters.
    async fn get_now_playing_movies(&self) -> Result<String, DataError>;

    /// Showtimes for `title` near `location`.
    async fn get_showtimes(&self, title: &str, location: &str) -> Result<String, DataError>;

    /// One title picked from a comma or newline separated list.
    async fn get_random_movie(&self, movies: &str) -> Result<String, DataError>;

    /// Critic and audience reviews for a movie id.
    async fn get_reviews(&self, movie_id: &str) -> Result<String, DataError>;

    /// Drafts a ticket purchase; nothing is charged yet.
    async fn buy_ticket(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError>;

    /// Finalizes a previously drafted purchase.
    async fn confirm_ticket_purchase(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError>;
}

/// Answer to a ticket draft or confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    /// The showing exists; the text describes the draft or the purchase.
    Accepted(String),
    /// Nothing was drafted or bought; the text says why.
    Rejected(String),
}

impl TicketOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TicketOutcome::Accepted(_))
    }

    pub fn text(&self) -> &str {
        match self {
            TicketOutcome::Accepted(text) | TicketOutcome::Rejected(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            TicketOutcome::Accepted(text) | TicketOutcome::Rejected(text) => text,
        }
    }
}
