use serde::{Deserialize, Serialize};

use crate::entities::{
    genre, movie, movie_cast::CastRole, person, watch_list::WatchStatus,
};

/// Listing card: what the index page needs and nothing else.
#[derive(Debug, Serialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub poster_url: String,
    pub release_year: Option<i32>,
    pub avg_score: Option<f64>,
}

impl MovieSummary {
    pub fn from_model(m: movie::Model, avg_score: Option<f64>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            poster_url: m.poster_url,
            release_year: m.release_year,
            avg_score,
        }
    }
}

/// Richer card used by similar-movies and watchlist embeds.
#[derive(Debug, Serialize)]
pub struct MovieCard {
    pub id: i32,
    pub title: String,
    pub poster_url: String,
    pub release_year: Option<i32>,
    pub country: String,
    pub runtime: Option<i32>,
    pub avg_score: Option<f64>,
}

impl MovieCard {
    pub fn from_model(m: movie::Model, avg_score: Option<f64>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            poster_url: m.poster_url,
            release_year: m.release_year,
            country: m.country,
            runtime: m.runtime,
            avg_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CastOut {
    pub id: i32,
    pub person: person::Model,
    pub role: CastRole,
    pub character_name: String,
}

#[derive(Debug, Serialize)]
pub struct MovieDetailOut {
    pub id: i32,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub poster_url: String,
    pub release_year: Option<i32>,
    pub country: String,
    pub runtime: Option<i32>,
    pub genres: Vec<genre::Model>,
    pub casts: Vec<CastOut>,
    pub avg_score: Option<f64>,
    pub user_score: Option<f64>,
    pub is_in_watchlist: bool,
}

#[derive(Debug, Serialize)]
pub struct ReviewOut {
    pub id: i32,
    pub movie_id: i32,
    pub author: String,
    pub content: String,
    pub like_count: u64,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct LikeOut {
    pub liked: bool,
    pub like_count: u64,
}

#[derive(Debug, Serialize)]
pub struct WatchListItem {
    pub id: i32,
    pub movie: MovieCard,
    pub status: WatchStatus,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AccessOut {
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub author: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WatchlistRequest {
    pub status: Option<WatchStatus>,
}
