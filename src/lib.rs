pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod importer;
pub mod models;
pub mod routes;
pub mod similar;
pub mod tmdb;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;

use crate::{config::Config, tmdb::TmdbClient};

pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub tmdb: Arc<TmdbClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/movies/", get(routes::list_movies))
        .route("/api/v1/movies/{id}/", get(routes::movie_detail))
        .route("/api/v1/movies/{id}/ratings/", post(routes::rate_movie))
        .route(
            "/api/v1/movies/{id}/reviews/",
            get(routes::list_reviews).post(routes::create_review),
        )
        .route("/api/v1/reviews/{id}/like/", post(routes::toggle_like))
        .route("/api/v1/movies/{id}/watchlist-toggle/", post(routes::watchlist_toggle))
        .route("/api/v1/movies/{id}/similar/", get(routes::similar_movies))
        .route("/api/v1/watchlist/me/", get(routes::my_watchlist))
        .route("/api/v1/auth/register/", post(routes::register))
        .route("/api/v1/auth/login/", post(routes::login))
        .route("/api/v1/auth/refresh/", post(routes::refresh))
        .route("/api/v1/auth/me/", get(routes::me))
        .with_state(state)
}
