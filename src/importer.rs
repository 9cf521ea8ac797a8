use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, sea_query::OnConflict,
};
use tracing::{info, warn};

use crate::{
    entities::{genre, movie, movie_cast, movie_cast::CastRole, movie_genre, person},
    error::AppResult,
    tmdb::{Credits, GenreEntry, MovieDetail, TmdbClient},
};

/// Only the top-billed cast entries are kept; TMDB delivers them in billing
/// order.
const TOP_BILLED_CAST: usize = 5;

#[derive(Debug, Default)]
pub struct ImportStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Eq, PartialEq)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

/// Pull `pages` pages of the popular listing and reconcile every movie into
/// the catalog. Safe to re-run: all writes are keyed upserts.
///
/// A failed detail fetch skips that one movie; a failed listing fetch aborts
/// the whole run.
pub async fn run(
    db: &DatabaseConnection,
    tmdb: &TmdbClient,
    image_base: &str,
    pages: u32,
) -> AppResult<ImportStats> {
    let mut stats = ImportStats::default();

    for page in 1..=pages {
        let listing = tmdb.popular(page).await?;
        info!(page, movies = listing.len(), "fetched popular page");

        for item in listing {
            let detail = match tmdb.movie_detail(item.id).await {
                Ok(detail) => detail,
                Err(err) => {
                    warn!(tmdb_id = item.id, error = %err, "failed to fetch movie detail, skipping");
                    stats.skipped += 1;
                    continue;
                },
            };

            match reconcile_movie(db, &detail, image_base).await? {
                Outcome::Created => stats.created += 1,
                Outcome::Updated => stats.updated += 1,
                Outcome::Skipped => stats.skipped += 1,
            }
        }
    }

    info!(
        created = stats.created,
        updated = stats.updated,
        skipped = stats.skipped,
        "import finished"
    );

    Ok(stats)
}

/// Upsert one movie plus its genre and cast associations from a detail
/// payload. The movie is keyed on (title, release_year); genre and cast sets
/// are replaced wholesale so stale associations never linger.
pub async fn reconcile_movie(
    db: &DatabaseConnection,
    detail: &MovieDetail,
    image_base: &str,
) -> AppResult<Outcome> {
    // Empty strings count as absent for every fallback here.
    let title = detail
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| detail.original_title.clone().filter(|t| !t.trim().is_empty()));
    let Some(title) = title else {
        warn!("movie payload without a usable title, skipping");
        return Ok(Outcome::Skipped);
    };

    let original_title = detail
        .original_title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| title.clone());
    let overview = detail.overview.clone().unwrap_or_default();
    let release_year = parse_release_year(detail.release_date.as_deref());
    let country = detail
        .production_countries
        .first()
        .map(|c| c.iso_3166_1.clone())
        .unwrap_or_default();
    let poster_url = detail
        .poster_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|path| format!("{image_base}{path}"))
        .unwrap_or_default();

    let now = now_sec();

    let mut query = movie::Entity::find().filter(movie::Column::Title.eq(&title));
    query = match release_year {
        Some(year) => query.filter(movie::Column::ReleaseYear.eq(year)),
        None => query.filter(movie::Column::ReleaseYear.is_null()),
    };

    let (movie_id, outcome) = match query.one(db).await? {
        Some(existing) => {
            let movie_id = existing.id;
            let mut active = existing.into_active_model();
            active.original_title = Set(original_title);
            active.overview = Set(overview);
            active.runtime = Set(detail.runtime);
            active.country = Set(country);
            active.poster_url = Set(poster_url);
            active.updated_at = Set(now);
            active.update(db).await?;
            info!(title = %title, year = ?release_year, "updated movie");
            (movie_id, Outcome::Updated)
        },
        None => {
            let inserted = movie::ActiveModel {
                title: Set(title.clone()),
                original_title: Set(original_title),
                release_year: Set(release_year),
                country: Set(country),
                runtime: Set(detail.runtime),
                poster_url: Set(poster_url),
                overview: Set(overview),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!(title = %title, year = ?release_year, "created movie");
            (inserted.id, Outcome::Created)
        },
    };

    set_genres(db, movie_id, &detail.genres).await?;
    set_credits(db, movie_id, &detail.credits).await?;

    Ok(outcome)
}

/// First '-'-segment of a release date string, parsed as a year. Absent or
/// malformed dates yield None.
fn parse_release_year(release_date: Option<&str>) -> Option<i32> {
    release_date?.split('-').next()?.parse().ok()
}

/// Replace the movie's genre set with exactly the payload's genres. This is a
/// full set-replacement, not an additive merge.
async fn set_genres(
    db: &DatabaseConnection,
    movie_id: i32,
    genres: &[GenreEntry],
) -> AppResult<()> {
    movie_genre::Entity::delete_many()
        .filter(movie_genre::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;

    for entry in genres {
        let Some(name) = entry.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let genre = genre_by_name(db, name).await?;
        let link = movie_genre::ActiveModel {
            movie_id: Set(movie_id),
            genre_id: Set(genre.id),
            ..Default::default()
        };
        movie_genre::Entity::insert(link)
            .on_conflict(
                OnConflict::columns([movie_genre::Column::MovieId, movie_genre::Column::GenreId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}

/// Delete all existing cast rows for the movie, then repopulate from the
/// credits payload: every crew member with job "Director", and the first
/// [`TOP_BILLED_CAST`] cast entries as actors.
async fn set_credits(db: &DatabaseConnection, movie_id: i32, credits: &Credits) -> AppResult<()> {
    movie_cast::Entity::delete_many()
        .filter(movie_cast::Column::MovieId.eq(movie_id))
        .exec(db)
        .await?;

    for crew in &credits.crew {
        if crew.job.as_deref() != Some("Director") {
            continue;
        }
        let Some(name) = crew.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let person = person_by_name(db, name).await?;
        insert_cast(db, movie_id, person.id, CastRole::Director, "").await?;
    }

    for cast in credits.cast.iter().take(TOP_BILLED_CAST) {
        let Some(name) = cast.name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let character = cast.character.as_deref().unwrap_or("");
        let person = person_by_name(db, name).await?;
        insert_cast(db, movie_id, person.id, CastRole::Actor, character).await?;
    }

    Ok(())
}

async fn insert_cast(
    db: &DatabaseConnection,
    movie_id: i32,
    person_id: i32,
    role: CastRole,
    character_name: &str,
) -> AppResult<()> {
    let row = movie_cast::ActiveModel {
        movie_id: Set(movie_id),
        person_id: Set(person_id),
        role: Set(role),
        character_name: Set(character_name.to_string()),
        ..Default::default()
    };

    // A payload can credit the same person twice in one role; the unique
    // triple absorbs it.
    movie_cast::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                movie_cast::Column::MovieId,
                movie_cast::Column::PersonId,
                movie_cast::Column::Role,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

async fn genre_by_name(db: &DatabaseConnection, name: &str) -> AppResult<genre::Model> {
    if let Some(existing) =
        genre::Entity::find().filter(genre::Column::Name.eq(name)).one(db).await?
    {
        return Ok(existing);
    }

    Ok(genre::ActiveModel { name: Set(name.to_string()), ..Default::default() }
        .insert(db)
        .await?)
}

// Name is assumed unique per person; two real people sharing a name collapse
// into one row.
async fn person_by_name(db: &DatabaseConnection, name: &str) -> AppResult<person::Model> {
    if let Some(existing) =
        person::Entity::find().filter(person::Column::Name.eq(name)).one(db).await?
    {
        return Ok(existing);
    }

    let now = now_sec();
    Ok(person::ActiveModel {
        name: Set(name.to_string()),
        profile: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{Database, ModelTrait, PaginatorTrait};

    use super::*;
    use crate::tmdb::{CastEntry, CrewEntry, ProductionCountry};

    async fn test_db() -> DatabaseConnection {
        // One pooled connection, or each checkout would see a fresh in-memory db.
        let mut opts = sea_orm::ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1);
        let db = Database::connect(opts).await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    fn arrival() -> MovieDetail {
        MovieDetail {
            title: Some("Arrival".to_string()),
            original_title: Some("Arrival".to_string()),
            overview: Some("A linguist is recruited to communicate.".to_string()),
            runtime: Some(116),
            release_date: Some("2016-12-25".to_string()),
            production_countries: vec![ProductionCountry { iso_3166_1: "US".to_string() }],
            poster_path: Some("/arrival.jpg".to_string()),
            genres: vec![
                GenreEntry { name: Some("Action".to_string()) },
                GenreEntry { name: Some("Drama".to_string()) },
            ],
            credits: Credits {
                cast: vec![
                    CastEntry {
                        name: Some("Amy Adams".to_string()),
                        character: Some("Louise Banks".to_string()),
                    },
                    CastEntry { name: Some("Jeremy Renner".to_string()), character: None },
                ],
                crew: vec![
                    CrewEntry {
                        name: Some("Denis Villeneuve".to_string()),
                        job: Some("Director".to_string()),
                    },
                    CrewEntry {
                        name: Some("Eric Heisserer".to_string()),
                        job: Some("Screenplay".to_string()),
                    },
                ],
            },
        }
    }

    #[test]
    fn release_year_parses_leading_segment() {
        assert_eq!(parse_release_year(Some("2016-12-25")), Some(2016));
        assert_eq!(parse_release_year(Some("1999")), Some(1999));
        assert_eq!(parse_release_year(Some("not-a-year")), None);
        assert_eq!(parse_release_year(Some("")), None);
        assert_eq!(parse_release_year(None), None);
    }

    #[tokio::test]
    async fn first_import_creates_movie_with_derived_fields() {
        let db = test_db().await;
        let outcome = reconcile_movie(&db, &arrival(), "https://img.example/w500").await.unwrap();
        assert_eq!(outcome, Outcome::Created);

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(movie.title, "Arrival");
        assert_eq!(movie.release_year, Some(2016));
        assert_eq!(movie.country, "US");
        assert_eq!(movie.poster_url, "https://img.example/w500/arrival.jpg");

        let casts = movie_cast::Entity::find().all(&db).await.unwrap();
        // One director plus two actors, screenplay credit excluded.
        assert_eq!(casts.len(), 3);
        assert_eq!(casts.iter().filter(|c| c.role == CastRole::Director).count(), 1);
        assert!(
            casts
                .iter()
                .filter(|c| c.role == CastRole::Actor)
                .any(|c| c.character_name == "Louise Banks")
        );
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let db = test_db().await;
        assert_eq!(reconcile_movie(&db, &arrival(), "base").await.unwrap(), Outcome::Created);
        assert_eq!(reconcile_movie(&db, &arrival(), "base").await.unwrap(), Outcome::Updated);

        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(person::Entity::find().count(&db).await.unwrap(), 3);
        assert_eq!(movie_genre::Entity::find().count(&db).await.unwrap(), 2);
        assert_eq!(movie_cast::Entity::find().count(&db).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn genre_set_is_replaced_wholesale() {
        let db = test_db().await;
        reconcile_movie(&db, &arrival(), "base").await.unwrap();

        let mut shrunk = arrival();
        shrunk.genres = vec![GenreEntry { name: Some("Drama".to_string()) }];
        reconcile_movie(&db, &shrunk, "base").await.unwrap();

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        let genres = movie.find_related(genre::Entity).all(&db).await.unwrap();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].name, "Drama");
    }

    #[tokio::test]
    async fn cast_is_rebuilt_from_payload() {
        let db = test_db().await;
        reconcile_movie(&db, &arrival(), "base").await.unwrap();

        let mut recast = arrival();
        recast.credits.cast =
            vec![CastEntry { name: Some("Forest Whitaker".to_string()), character: None }];
        reconcile_movie(&db, &recast, "base").await.unwrap();

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        let casts = movie_cast::Entity::find()
            .filter(movie_cast::Column::MovieId.eq(movie.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(casts.len(), 2);

        let actor_ids: Vec<i32> = casts
            .iter()
            .filter(|c| c.role == CastRole::Actor)
            .map(|c| c.person_id)
            .collect();
        let whitaker = person::Entity::find()
            .filter(person::Column::Name.eq("Forest Whitaker"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actor_ids, vec![whitaker.id]);
    }

    #[tokio::test]
    async fn only_top_billed_cast_is_kept() {
        let db = test_db().await;
        let mut detail = arrival();
        detail.credits.crew.clear();
        detail.credits.cast = (0..8)
            .map(|i| CastEntry { name: Some(format!("Actor {i}")), character: None })
            .collect();

        reconcile_movie(&db, &detail, "base").await.unwrap();
        assert_eq!(movie_cast::Entity::find().count(&db).await.unwrap(), TOP_BILLED_CAST as u64);
    }

    #[tokio::test]
    async fn missing_fields_fall_back() {
        let db = test_db().await;
        let detail = MovieDetail {
            original_title: Some("Gisaengchung".to_string()),
            ..Default::default()
        };

        reconcile_movie(&db, &detail, "base").await.unwrap();

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(movie.title, "Gisaengchung");
        assert_eq!(movie.original_title, "Gisaengchung");
        assert_eq!(movie.release_year, None);
        assert_eq!(movie.country, "");
        assert_eq!(movie.poster_url, "");
        assert_eq!(movie.overview, "");
        assert_eq!(movie.runtime, None);
    }

    #[tokio::test]
    async fn empty_title_falls_back_to_original_title() {
        let db = test_db().await;
        let detail = MovieDetail {
            title: Some(String::new()),
            original_title: Some("Gisaengchung".to_string()),
            ..Default::default()
        };

        let outcome = reconcile_movie(&db, &detail, "base").await.unwrap();
        assert_eq!(outcome, Outcome::Created);

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(movie.title, "Gisaengchung");
    }

    #[tokio::test]
    async fn empty_strings_are_treated_as_absent() {
        let db = test_db().await;
        let mut detail = arrival();
        detail.original_title = Some(String::new());
        detail.poster_path = Some(String::new());

        reconcile_movie(&db, &detail, "https://img.example/w500").await.unwrap();

        let movie = movie::Entity::find().one(&db).await.unwrap().unwrap();
        // Blank original_title falls back to title; blank poster_path must not
        // leave a bare image-base prefix behind.
        assert_eq!(movie.original_title, "Arrival");
        assert_eq!(movie.poster_url, "");
    }

    #[tokio::test]
    async fn payload_without_title_is_skipped() {
        let db = test_db().await;
        let outcome = reconcile_movie(&db, &MovieDetail::default(), "base").await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);

        let blank = MovieDetail {
            title: Some(String::new()),
            original_title: Some("   ".to_string()),
            ..Default::default()
        };
        let outcome = reconcile_movie(&db, &blank, "base").await.unwrap();
        assert_eq!(outcome, Outcome::Skipped);

        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn null_year_row_is_matched_on_reimport() {
        let db = test_db().await;
        let mut detail = arrival();
        detail.release_date = None;

        reconcile_movie(&db, &detail, "base").await.unwrap();
        reconcile_movie(&db, &detail, "base").await.unwrap();

        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);
    }
}
