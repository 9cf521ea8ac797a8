use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};

use crate::{
    entities::{movie, movie_genre},
    error::{AppError, AppResult},
};

const MAX_SIMILAR: u64 = 10;

/// Up to [`MAX_SIMILAR`] movies "similar" to the target, by strict fallback:
/// shared genre, then same country, then anything else. Tiers never blend;
/// ordering within a tier is natural storage order.
pub async fn similar_movies(
    db: &DatabaseConnection,
    movie_id: i32,
) -> AppResult<Vec<movie::Model>> {
    let target = movie::Entity::find_by_id(movie_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("movie"))?;

    let genre_ids: Vec<i32> = movie_genre::Entity::find()
        .filter(movie_genre::Column::MovieId.eq(target.id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.genre_id)
        .collect();

    if !genre_ids.is_empty() {
        let candidate_ids: Vec<i32> = movie_genre::Entity::find()
            .select_only()
            .column(movie_genre::Column::MovieId)
            .filter(movie_genre::Column::GenreId.is_in(genre_ids))
            .filter(movie_genre::Column::MovieId.ne(target.id))
            .distinct()
            .into_tuple()
            .all(db)
            .await?;

        if !candidate_ids.is_empty() {
            return Ok(movie::Entity::find()
                .filter(movie::Column::Id.is_in(candidate_ids))
                .limit(MAX_SIMILAR)
                .all(db)
                .await?);
        }
    }

    // Country match is exact, including empty string against empty string.
    let by_country = movie::Entity::find()
        .filter(movie::Column::Country.eq(&target.country))
        .filter(movie::Column::Id.ne(target.id))
        .limit(MAX_SIMILAR)
        .all(db)
        .await?;

    if !by_country.is_empty() {
        return Ok(by_country);
    }

    Ok(movie::Entity::find()
        .filter(movie::Column::Id.ne(target.id))
        .limit(MAX_SIMILAR)
        .all(db)
        .await?)
}
