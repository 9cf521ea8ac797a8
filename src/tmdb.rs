use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::Deserialize;

use crate::error::AppResult;

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, access_token: String, base_url: String, rps: u32) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("no TMDB_ACCESS_TOKEN provided - import requests will be rejected");
        }

        let limiter =
            Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::new(rps.max(1)).unwrap())));
        Self { client, access_token, base_url, limiter }
    }

    /// One page of the popularity-ranked listing. Non-2xx here is fatal for
    /// the page: the importer propagates it.
    pub async fn popular(&self, page: u32) -> AppResult<Vec<PopularMovie>> {
        self.limiter.until_ready().await;

        let url = format!("{}/movie/popular", self.base_url.trim_end_matches('/'));
        let resp: PopularResponse = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("page", page)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.results)
    }

    /// Full detail plus credits in a single round trip.
    pub async fn movie_detail(&self, tmdb_id: i64) -> AppResult<MovieDetail> {
        self.limiter.until_ready().await;

        let url = format!("{}/movie/{}", self.base_url.trim_end_matches('/'), tmdb_id);
        let detail: MovieDetail = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("append_to_response", "credits")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(detail)
    }
}

#[derive(Debug, Deserialize)]
struct PopularResponse {
    #[serde(default)]
    results: Vec<PopularMovie>,
}

#[derive(Debug, Deserialize)]
pub struct PopularMovie {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieDetail {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub runtime: Option<i32>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<GenreEntry>,
    #[serde(default)]
    pub credits: Credits,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenreEntry {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastEntry>,
    #[serde(default)]
    pub crew: Vec<CrewEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CastEntry {
    pub name: Option<String>,
    pub character: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrewEntry {
    pub name: Option<String>,
    pub job: Option<String>,
}
