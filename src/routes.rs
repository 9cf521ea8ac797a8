use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::OnConflict,
};

use crate::{
    AppState,
    auth::{self, AuthUser, MaybeUser, TokenKind, TokenPair},
    entities::{
        genre, like_review, movie, movie_cast, person, rating, review, user,
        watch_list::{self, WatchStatus},
    },
    error::{AppError, AppResult},
    models::{
        AccessOut, CastOut, LikeOut, LoginRequest, MovieCard, MovieDetailOut, MovieSummary,
        RatingRequest, RefreshRequest, RegisterRequest, ReviewOut, ReviewRequest, UserOut,
        WatchListItem, WatchlistRequest,
    },
    similar,
};

/// Mean rating per movie, computed over (movie_id, score) pairs. Movies with
/// no ratings are absent from the map.
async fn avg_scores(db: &DatabaseConnection) -> AppResult<HashMap<i32, f64>> {
    let pairs: Vec<(i32, f64)> = rating::Entity::find()
        .select_only()
        .column(rating::Column::MovieId)
        .column(rating::Column::Score)
        .into_tuple()
        .all(db)
        .await?;

    let mut sums: HashMap<i32, (f64, u32)> = HashMap::new();
    for (movie_id, score) in pairs {
        let entry = sums.entry(movie_id).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    Ok(sums.into_iter().map(|(id, (sum, n))| (id, sum / n as f64)).collect())
}

async fn avg_score_for(db: &DatabaseConnection, movie_id: i32) -> AppResult<Option<f64>> {
    let scores: Vec<f64> = rating::Entity::find()
        .select_only()
        .column(rating::Column::Score)
        .filter(rating::Column::MovieId.eq(movie_id))
        .into_tuple()
        .all(db)
        .await?;

    if scores.is_empty() {
        return Ok(None);
    }
    Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
}

async fn find_movie(db: &DatabaseConnection, id: i32) -> AppResult<movie::Model> {
    movie::Entity::find_by_id(id).one(db).await?.ok_or(AppError::NotFound("movie"))
}

// Stop-gap identity for unauthenticated watchlist actions: the first
// persisted user. TODO: drop once the frontend always sends credentials.
async fn fallback_user(db: &DatabaseConnection) -> AppResult<Option<user::Model>> {
    Ok(user::Entity::find().order_by_asc(user::Column::Id).one(db).await?)
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let avgs = avg_scores(&state.db).await?;
    let movies = movie::Entity::find()
        .order_by_desc(movie::Column::Id)
        .all(&state.db)
        .await?;

    let out = movies
        .into_iter()
        .map(|m| {
            let avg = avgs.get(&m.id).copied();
            MovieSummary::from_model(m, avg)
        })
        .collect();

    Ok(Json(out))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieDetailOut>> {
    let movie = find_movie(&state.db, id).await?;

    let genres = movie.find_related(genre::Entity).all(&state.db).await?;

    let casts = movie_cast::Entity::find()
        .filter(movie_cast::Column::MovieId.eq(movie.id))
        .find_also_related(person::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .filter_map(|(cast, person)| {
            person.map(|person| CastOut {
                id: cast.id,
                person,
                role: cast.role,
                character_name: cast.character_name,
            })
        })
        .collect();

    let avg_score = avg_score_for(&state.db, movie.id).await?;

    let (user_score, is_in_watchlist) = match &viewer {
        Some(viewer) => {
            let score = rating::Entity::find()
                .filter(rating::Column::UserId.eq(viewer.id))
                .filter(rating::Column::MovieId.eq(movie.id))
                .one(&state.db)
                .await?
                .map(|r| r.score);
            let listed = watch_list::Entity::find()
                .filter(watch_list::Column::UserId.eq(viewer.id))
                .filter(watch_list::Column::MovieId.eq(movie.id))
                .count(&state.db)
                .await?
                > 0;
            (score, listed)
        },
        None => (None, false),
    };

    Ok(Json(MovieDetailOut {
        id: movie.id,
        title: movie.title,
        original_title: movie.original_title,
        overview: movie.overview,
        poster_url: movie.poster_url,
        release_year: movie.release_year,
        country: movie.country,
        runtime: movie.runtime,
        genres,
        casts,
        avg_score,
        user_score,
        is_in_watchlist,
    }))
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    viewer: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<RatingRequest>,
) -> AppResult<(StatusCode, Json<rating::Model>)> {
    let movie = find_movie(&state.db, id).await?;

    // Scores carry a single fractional digit.
    let score = (req.score * 10.0).round() / 10.0;
    let now = now_sec();

    let existed = rating::Entity::find()
        .filter(rating::Column::UserId.eq(viewer.id))
        .filter(rating::Column::MovieId.eq(movie.id))
        .count(&state.db)
        .await?
        > 0;

    // Atomic upsert on the (user, movie) unique pair: a concurrent duplicate
    // lands in the update arm instead of tripping the constraint.
    let row = rating::ActiveModel {
        user_id: Set(viewer.id),
        movie_id: Set(movie.id),
        score: Set(score),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    rating::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([rating::Column::UserId, rating::Column::MovieId])
                .update_columns([rating::Column::Score, rating::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    let saved = rating::Entity::find()
        .filter(rating::Column::UserId.eq(viewer.id))
        .filter(rating::Column::MovieId.eq(movie.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("rating upsert did not persist")))?;

    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(saved)))
}

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<ReviewOut>>> {
    let movie = find_movie(&state.db, id).await?;

    let reviews = review::Entity::find()
        .filter(review::Column::MovieId.eq(movie.id))
        .order_by_desc(review::Column::Id)
        .all(&state.db)
        .await?;

    let review_ids: Vec<i32> = reviews.iter().map(|r| r.id).collect();
    let liked_review_ids: Vec<i32> = like_review::Entity::find()
        .select_only()
        .column(like_review::Column::ReviewId)
        .filter(like_review::Column::ReviewId.is_in(review_ids))
        .into_tuple()
        .all(&state.db)
        .await?;

    let mut counts: HashMap<i32, u64> = HashMap::new();
    for review_id in liked_review_ids {
        *counts.entry(review_id).or_insert(0) += 1;
    }

    let out = reviews
        .into_iter()
        .map(|r| {
            let like_count = counts.get(&r.id).copied().unwrap_or(0);
            ReviewOut {
                id: r.id,
                movie_id: r.movie_id,
                author: r.author,
                content: r.content,
                like_count,
                created_at: r.created_at,
            }
        })
        .collect();

    Ok(Json(out))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(req): Json<ReviewRequest>,
) -> AppResult<(StatusCode, Json<ReviewOut>)> {
    let movie = find_movie(&state.db, id).await?;

    if req.content.trim().is_empty() {
        return Err(AppError::BadRequest("review content is required".to_string()));
    }

    let created = review::ActiveModel {
        movie_id: Set(movie.id),
        author: Set(req.author),
        content: Set(req.content),
        created_at: Set(now_sec()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let out = ReviewOut {
        id: created.id,
        movie_id: created.movie_id,
        author: created.author,
        content: created.content,
        like_count: 0,
        created_at: created.created_at,
    };

    Ok((StatusCode::CREATED, Json(out)))
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    viewer: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<LikeOut>> {
    let review = review::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("review"))?;

    let existing = like_review::Entity::find()
        .filter(like_review::Column::ReviewId.eq(review.id))
        .filter(like_review::Column::UserId.eq(viewer.id))
        .one(&state.db)
        .await?;

    let liked = match existing {
        Some(like) => {
            like.delete(&state.db).await?;
            false
        },
        None => {
            like_review::ActiveModel {
                review_id: Set(review.id),
                user_id: Set(viewer.id),
                created_at: Set(now_sec()),
                ..Default::default()
            }
            .insert(&state.db)
            .await?;
            true
        },
    };

    let like_count = like_review::Entity::find()
        .filter(like_review::Column::ReviewId.eq(review.id))
        .count(&state.db)
        .await?;

    Ok(Json(LikeOut { liked, like_count }))
}

pub async fn watchlist_toggle(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i32>,
    body: Result<Json<WatchlistRequest>, JsonRejection>,
) -> AppResult<Json<watch_list::Model>> {
    let movie = find_movie(&state.db, id).await?;
    // Omitting the body (or just the status key) means WANT. A body that was
    // sent but does not parse is rejected; a bad status must not mutate state.
    let status = match body {
        Ok(Json(req)) => req.status.unwrap_or(WatchStatus::Want),
        Err(JsonRejection::MissingJsonContentType(_)) => WatchStatus::Want,
        Err(rejection) => return Err(AppError::BadRequest(rejection.body_text())),
    };

    let user_id = match viewer {
        Some(viewer) => viewer.id,
        None => fallback_user(&state.db)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| {
                AppError::BadRequest(
                    "no user account available; register an account first".to_string(),
                )
            })?,
    };

    let now = now_sec();

    let row = watch_list::ActiveModel {
        user_id: Set(user_id),
        movie_id: Set(movie.id),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    watch_list::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([watch_list::Column::UserId, watch_list::Column::MovieId])
                .update_columns([watch_list::Column::Status, watch_list::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    let entry = watch_list::Entity::find()
        .filter(watch_list::Column::UserId.eq(user_id))
        .filter(watch_list::Column::MovieId.eq(movie.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("watchlist upsert did not persist")))?;

    Ok(Json(entry))
}

pub async fn similar_movies(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<MovieCard>>> {
    let movies = similar::similar_movies(&state.db, id).await?;
    let avgs = avg_scores(&state.db).await?;

    let out = movies
        .into_iter()
        .map(|m| {
            let avg = avgs.get(&m.id).copied();
            MovieCard::from_model(m, avg)
        })
        .collect();

    Ok(Json(out))
}

pub async fn my_watchlist(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<Vec<WatchListItem>>> {
    let user_id = match viewer {
        Some(viewer) => Some(viewer.id),
        None => fallback_user(&state.db).await?.map(|u| u.id),
    };
    let Some(user_id) = user_id else {
        return Ok(Json(Vec::new()));
    };

    let entries = watch_list::Entity::find()
        .filter(watch_list::Column::UserId.eq(user_id))
        .order_by_desc(watch_list::Column::CreatedAt)
        .find_also_related(movie::Entity)
        .all(&state.db)
        .await?;

    let avgs = avg_scores(&state.db).await?;

    let out = entries
        .into_iter()
        .filter_map(|(entry, movie)| {
            movie.map(|m| {
                let avg = avgs.get(&m.id).copied();
                WatchListItem {
                    id: entry.id,
                    movie: MovieCard::from_model(m, avg),
                    status: entry.status,
                    created_at: entry.created_at,
                }
            })
        })
        .collect();

    Ok(Json(out))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserOut>)> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("password is required".to_string()));
    }

    // Uniqueness rides on the username index: do-nothing on conflict, then
    // zero rows written means the name was taken, racing registrations
    // included.
    let row = user::ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(auth::hash_password(&req.password)?),
        created_at: Set(now_sec()),
        ..Default::default()
    };
    let written = user::Entity::insert(row)
        .on_conflict(OnConflict::column(user::Column::Username).do_nothing().to_owned())
        .exec_without_returning(&state.db)
        .await?;
    if written == 0 {
        return Err(AppError::BadRequest("username is already taken".to_string()));
    }

    let created = user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("registered user not found")))?;

    Ok((StatusCode::CREATED, Json(UserOut { id: created.id, username: created.username })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let account = user::Entity::find()
        .filter(user::Column::Username.eq(&req.username))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    if !auth::verify_password(&req.password, &account.password_hash)? {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    Ok(Json(auth::issue_pair(account.id, &state.config)?))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<AccessOut>> {
    let claims = auth::decode_token(&req.refresh, &state.config.jwt_secret)?;
    if claims.kind != TokenKind::Refresh {
        return Err(AppError::Unauthorized("not a refresh token".to_string()));
    }

    let account = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

    let access = auth::issue_token(account.id, TokenKind::Access, &state.config)?;
    Ok(Json(AccessOut { access }))
}

pub async fn me(viewer: AuthUser) -> Json<UserOut> {
    Json(UserOut { id: viewer.id, username: viewer.username })
}
