use std::fs;
use std::path::Path;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DataError;
use super::{MovieData, TicketOutcome};

const BUNDLED_CATALOG: &str = include_str!("catalog.yaml");
const CONFIRMATION_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogData {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub theaters: Vec<Theater>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Review {
    pub source: String,
    pub quote: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Theater {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub showings: Vec<Showing>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Showing {
    pub movie_id: String,
    pub times: Vec<String>,
}

/// In-memory [`MovieData`] backed by a fixed list of movies and theaters.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    data: CatalogData,
}

impl Catalog {
    pub fn new(data: CatalogData) -> Self {
        Self { data }
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> Result<Self, DataError> {
        Self::from_yaml(BUNDLED_CATALOG)
    }

    pub fn from_yaml(source: &str) -> Result<Self, DataError> {
        Ok(Self::new(serde_yaml::from_str(source)?))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, DataError> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    fn movie_by_id(&self, movie_id: &str) -> Option<&Movie> {
        let movie_id = movie_id.trim();
        self.data.movies.iter().find(|m| m.id == movie_id)
    }

    fn movie_by_title(&self, title: &str) -> Option<&Movie> {
        let wanted = normalize(title);
        self.data
            .movies
            .iter()
            .find(|m| normalize(&m.title) == wanted)
            .or_else(|| {
                self.data
                    .movies
                    .iter()
                    .find(|m| normalize(&m.title).contains(&wanted))
            })
    }

    fn theater(&self, name: &str) -> Option<&Theater> {
        let wanted = normalize(name);
        self.data
            .theaters
            .iter()
            .find(|t| normalize(&t.name) == wanted)
    }

    fn showing_exists(&self, theater: &Theater, movie_id: &str, showtime: &str) -> bool {
        let wanted = normalize(showtime);
        theater
            .showings
            .iter()
            .filter(|s| s.movie_id == movie_id.trim())
            .any(|s| s.times.iter().any(|t| normalize(t) == wanted))
    }

    /// Resolves the three ticket arguments, or explains which one is wrong.
    fn resolve_ticket(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<(&Theater, &Movie), String> {
        if let Some(reason) = blank_argument(&[
            ("theater", theater),
            ("movie_id", movie_id),
            ("showtime", showtime),
        ]) {
            return Err(reason);
        }

        let Some(movie) = self.movie_by_id(movie_id) else {
            return Err(format!("No movie with ID {movie_id} is playing."));
        };
        let Some(venue) = self.theater(theater) else {
            return Err(format!("No theater named {theater} was found."));
        };
        if !self.showing_exists(venue, &movie.id, showtime) {
            return Err(format!(
                "{} is not showing {} at {showtime}.",
                venue.name, movie.title
            ));
        }
        Ok((venue, movie))
    }
}

#[async_trait]
impl MovieData for Catalog {
    async fn get_now_playing_movies(&self) -> Result<String, DataError> {
        if self.data.movies.is_empty() {
            return Ok("No movies are playing right now.".to_string());
        }
        let lines: Vec<String> = self
            .data
            .movies
            .iter()
            .map(|m| format!("- {} (ID: {})", m.title, m.id))
            .collect();
        Ok(format!("Now playing:\n{}", lines.join("\n")))
    }

    async fn get_showtimes(&self, title: &str, location: &str) -> Result<String, DataError> {
        if let Some(reason) = blank_argument(&[("title", title), ("location", location)]) {
            return Ok(reason);
        }

        let Some(movie) = self.movie_by_title(title) else {
            return Ok(format!("No movie titled {title} is playing."));
        };
        let wanted = normalize(location);
        let mut lines = Vec::new();
        for theater in &self.data.theaters {
            if !location_matches(&normalize(&theater.location), &wanted) {
                continue;
            }
            for showing in theater.showings.iter().filter(|s| s.movie_id == movie.id) {
                lines.push(format!(
                    "- {} ({}): {}",
                    theater.name,
                    theater.location,
                    showing.times.join(", ")
                ));
            }
        }
        if lines.is_empty() {
            return Ok(format!(
                "No showtimes for {} (ID: {}) found near {location}.",
                movie.title, movie.id
            ));
        }
        Ok(format!(
            "Showtimes for {} (ID: {}) near {location}:\n{}",
            movie.title,
            movie.id,
            lines.join("\n")
        ))
    }

    async fn get_random_movie(&self, movies: &str) -> Result<String, DataError> {
        let titles: Vec<&str> = movies
            .split([',', '\n'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        Ok(titles
            .choose(&mut rand::thread_rng())
            .map(|t| t.to_string())
            .unwrap_or_else(|| {
                "No movie titles were given to choose from. Ask the user which movies to pick between."
                    .to_string()
            }))
    }

    async fn get_reviews(&self, movie_id: &str) -> Result<String, DataError> {
        if let Some(reason) = blank_argument(&[("movie_id", movie_id)]) {
            return Ok(reason);
        }

        let Some(movie) = self.movie_by_id(movie_id) else {
            return Ok(format!("No reviews found for movie ID {movie_id}."));
        };
        if movie.reviews.is_empty() {
            return Ok(format!("No reviews have been published for {} yet.", movie.title));
        }
        let lines: Vec<String> = movie
            .reviews
            .iter()
            .map(|r| format!("- {}: \"{}\"", r.source, r.quote))
            .collect();
        Ok(lines.join("\n"))
    }

    async fn buy_ticket(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError> {
        let (venue, movie) = match self.resolve_ticket(theater, movie_id, showtime) {
            Ok(found) => found,
            Err(reason) => return Ok(TicketOutcome::Rejected(reason)),
        };
        Ok(TicketOutcome::Accepted(format!(
            "Ticket draft: 1 ticket for {} (ID: {}) at {}, {showtime}. \
             Nothing has been charged. Repeat these details and ask the user to confirm.",
            movie.title, movie.id, venue.name
        )))
    }

    async fn confirm_ticket_purchase(
        &self,
        theater: &str,
        movie_id: &str,
        showtime: &str,
    ) -> Result<TicketOutcome, DataError> {
        let (venue, movie) = match self.resolve_ticket(theater, movie_id, showtime) {
            Ok(found) => found,
            Err(reason) => return Ok(TicketOutcome::Rejected(reason)),
        };
        let code: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(CONFIRMATION_CODE_LEN)
            .collect::<String>()
            .to_uppercase();
        Ok(TicketOutcome::Accepted(format!(
            "Purchase confirmed: 1 ticket for {} at {}, {showtime}. Confirmation code: {code}.",
            movie.title, venue.name
        )))
    }
}

/// Names the first blank argument so the model can ask the user for it.
fn blank_argument(arguments: &[(&str, &str)]) -> Option<String> {
    arguments
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| format!("The {name} argument was empty. Ask the user for it and try again."))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// "austin" matches "austin, tx", and "austin, texas" matches on the city.
fn location_matches(theater_location: &str, wanted: &str) -> bool {
    if theater_location.contains(wanted) || wanted.contains(theater_location) {
        return true;
    }
    let city = |loc: &str| loc.split(',').next().unwrap_or_default().trim().to_string();
    !city(wanted).is_empty() && city(theater_location) == city(wanted)
}
