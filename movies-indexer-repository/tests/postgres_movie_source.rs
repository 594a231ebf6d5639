//! Integration tests for the PostgreSQL movie source.
//!
//! These tests require a real PostgreSQL database (`DATABASE_URL`) and use SQLx
//! test macros to ensure proper test isolation and cleanup.
//!
//! Run with: `cargo test --test postgres_movie_source -- --ignored`

use chrono::{DateTime, TimeZone, Utc};
use movies_indexer_repository::{MovieSource, PostgresMovieSource, SourceError};
use movies_indexer_shared::{Cursor, EntityKind, PersonRole};
use uuid::Uuid;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
}

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

async fn insert_movie(pool: &sqlx::PgPool, movie_id: Uuid, title: &str, modified_at: DateTime<Utc>) {
    sqlx::query(
        "INSERT INTO content.film_work (id, title, description, rating, type, created_at, modified_at) \
         VALUES ($1, $2, 'A description', 7.5, 'movie', $3, $3)",
    )
    .bind(movie_id)
    .bind(title)
    .bind(modified_at)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_person(pool: &sqlx::PgPool, person_id: Uuid, name: &str, modified_at: DateTime<Utc>) {
    sqlx::query(
        "INSERT INTO content.person (id, full_name, created_at, modified_at) VALUES ($1, $2, $3, $3)",
    )
    .bind(person_id)
    .bind(name)
    .bind(modified_at)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_genre(pool: &sqlx::PgPool, genre_id: Uuid, name: &str, modified_at: DateTime<Utc>) {
    sqlx::query("INSERT INTO content.genre (id, name, created_at, modified_at) VALUES ($1, $2, $3, $3)")
        .bind(genre_id)
        .bind(name)
        .bind(modified_at)
        .execute(pool)
        .await
        .unwrap();
}

async fn credit(pool: &sqlx::PgPool, person_id: Uuid, movie_id: Uuid, role: &str) {
    sqlx::query(
        "INSERT INTO content.person_film_work (id, person_id, film_work_id, role) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(person_id)
    .bind(movie_id)
    .bind(role)
    .execute(pool)
    .await
    .unwrap();
}

async fn tag(pool: &sqlx::PgPool, genre_id: Uuid, movie_id: Uuid) {
    sqlx::query("INSERT INTO content.genre_film_work (id, genre_id, film_work_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(genre_id)
        .bind(movie_id)
        .execute(pool)
        .await
        .unwrap();
}

// ============================================================================
// Change scan tests
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_scan_breaks_timestamp_ties_by_id(pool: sqlx::PgPool) {
    let source = PostgresMovieSource::new(pool.clone(), "content").unwrap();
    insert_movie(&pool, id(2), "Second", ts(10)).await;
    insert_movie(&pool, id(1), "First", ts(10)).await;

    let first = source
        .scan_changed(EntityKind::Movie, Cursor::epoch(), 1)
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, id(1));

    let second = source
        .scan_changed(EntityKind::Movie, first[0].cursor(), 1)
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, id(2));

    let done = source
        .scan_changed(EntityKind::Movie, second[0].cursor(), 1)
        .await
        .unwrap();
    assert!(done.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_scan_returns_only_rows_after_cursor(pool: sqlx::PgPool) {
    let source = PostgresMovieSource::new(pool.clone(), "content").unwrap();
    insert_person(&pool, id(1), "Old", ts(1)).await;
    insert_person(&pool, id(2), "New", ts(5)).await;
    insert_person(&pool, id(3), "Newer", ts(9)).await;

    let cursor = Cursor::new(ts(5), id(2));
    let page = source
        .scan_changed(EntityKind::Person, cursor, 10)
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert!(page.iter().all(|r| r.cursor() > cursor));

    let again = source
        .scan_changed(EntityKind::Person, cursor, 10)
        .await
        .unwrap();
    assert_eq!(page, again);
}

// ============================================================================
// Fan-out and full row tests
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_fanout_lookups(pool: sqlx::PgPool) {
    let source = PostgresMovieSource::new(pool.clone(), "content").unwrap();
    insert_movie(&pool, id(10), "Movie", ts(1)).await;
    insert_person(&pool, id(20), "Actor", ts(1)).await;
    insert_genre(&pool, id(30), "Drama", ts(1)).await;
    credit(&pool, id(20), id(10), "actor").await;
    credit(&pool, id(20), id(10), "writer").await;
    tag(&pool, id(30), id(10)).await;

    let by_person = source.movies_by_persons(&[id(20)]).await.unwrap();
    assert_eq!(by_person.len(), 1);
    assert_eq!(by_person[0].id, id(10));

    let by_genre = source.movies_by_genres(&[id(30)]).await.unwrap();
    assert_eq!(by_genre.len(), 1);
    assert_eq!(by_genre[0].id, id(10));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_full_movie_rows_nest_credits_and_genres(pool: sqlx::PgPool) {
    let source = PostgresMovieSource::new(pool.clone(), "content").unwrap();
    insert_movie(&pool, id(10), "Star Slammer", ts(1)).await;
    insert_movie(&pool, id(11), "Bare", ts(1)).await;
    insert_person(&pool, id(20), "Ann", ts(1)).await;
    insert_person(&pool, id(21), "Bob", ts(1)).await;
    insert_genre(&pool, id(30), "Sci-Fi", ts(1)).await;
    credit(&pool, id(20), id(10), "actor").await;
    credit(&pool, id(21), id(10), "DR").await;
    tag(&pool, id(30), id(10)).await;

    let mut rows = source
        .full_movie_rows(&[id(10), id(11), id(99)])
        .await
        .unwrap();
    rows.sort_by_key(|r| r.id);

    assert_eq!(rows.len(), 2);
    let full = &rows[0];
    assert_eq!(full.title, "Star Slammer");
    assert_eq!(full.rating, Some(7.5));
    assert_eq!(full.genres, vec!["Sci-Fi".to_string()]);
    assert_eq!(full.persons.len(), 2);
    assert!(full
        .persons
        .iter()
        .any(|p| p.name == "Bob" && p.role == PersonRole::Director));

    let bare = &rows[1];
    assert!(bare.persons.is_empty());
    assert!(bare.genres.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_unknown_role_is_integrity_error(pool: sqlx::PgPool) {
    let source = PostgresMovieSource::new(pool.clone(), "content").unwrap();
    insert_movie(&pool, id(10), "Movie", ts(1)).await;
    insert_person(&pool, id(20), "Someone", ts(1)).await;
    credit(&pool, id(20), id(10), "producer").await;

    let result = source.full_movie_rows(&[id(10)]).await;
    assert!(matches!(result, Err(SourceError::DataIntegrityError(_))));
}
