use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// Trip row. `author_id` goes NULL when the owning user is deleted
/// (ON DELETE SET NULL), so it stays optional here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub photos: Vec<String>,
    pub tags: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub author_id: Option<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const TRIP_COLUMNS: &str = "id, title, description, photos, tags, latitude, longitude, \
                            author_id, created_at, updated_at";

pub struct NewTrip<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub photos: &'a [String],
    pub tags: &'a [String],
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub author_id: i64,
}

pub struct TripUpdate<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub photos: &'a [String],
    pub tags: &'a [String],
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Trip>> {
    let rows = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips ORDER BY created_at DESC",
        TRIP_COLUMNS
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Case-insensitive substring match over title and description.
pub async fn search_by_keyword(db: &PgPool, keyword: &str) -> anyhow::Result<Vec<Trip>> {
    let pattern = format!("%{}%", keyword);
    let rows = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips WHERE title ILIKE $1 OR description ILIKE $1 \
         ORDER BY created_at DESC",
        TRIP_COLUMNS
    ))
    .bind(pattern)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Whole-tag membership via the Postgres array operator.
pub async fn find_by_tag(db: &PgPool, tag: &str) -> anyhow::Result<Vec<Trip>> {
    let rows = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips WHERE $1 = ANY(tags) ORDER BY created_at DESC",
        TRIP_COLUMNS
    ))
    .bind(tag)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Trips within `radius_km` of a point, haversine over rows that have both
/// coordinates set.
pub async fn find_nearby(
    db: &PgPool,
    lat: f64,
    lng: f64,
    radius_km: f64,
) -> anyhow::Result<Vec<Trip>> {
    let rows = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips \
         WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
           AND 6371 * acos(LEAST(1.0, \
                 cos(radians($1)) * cos(radians(latitude)) * \
                 cos(radians(longitude) - radians($2)) + \
                 sin(radians($1)) * sin(radians(latitude)))) <= $3",
        TRIP_COLUMNS
    ))
    .bind(lat)
    .bind(lng)
    .bind(radius_km)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_author(db: &PgPool, author_id: i64) -> anyhow::Result<Vec<Trip>> {
    let rows = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips WHERE author_id = $1 ORDER BY created_at DESC",
        TRIP_COLUMNS
    ))
    .bind(author_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Trip>> {
    let row = sqlx::query_as::<_, Trip>(&format!(
        "SELECT {} FROM trips WHERE id = $1",
        TRIP_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, new: NewTrip<'_>) -> anyhow::Result<Trip> {
    let row = sqlx::query_as::<_, Trip>(&format!(
        "INSERT INTO trips (title, description, photos, tags, latitude, longitude, author_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {}",
        TRIP_COLUMNS
    ))
    .bind(new.title)
    .bind(new.description)
    .bind(new.photos)
    .bind(new.tags)
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.author_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: i64, up: TripUpdate<'_>) -> anyhow::Result<Trip> {
    let row = sqlx::query_as::<_, Trip>(&format!(
        "UPDATE trips SET title = $2, description = $3, photos = $4, tags = $5, \
         latitude = $6, longitude = $7, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {}",
        TRIP_COLUMNS
    ))
    .bind(id)
    .bind(up.title)
    .bind(up.description)
    .bind(up.photos)
    .bind(up.tags)
    .bind(up.latitude)
    .bind(up.longitude)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Replace the photo list only, refreshing `updated_at`.
pub async fn set_photos(db: &PgPool, id: i64, photos: &[String]) -> anyhow::Result<Trip> {
    let row = sqlx::query_as::<_, Trip>(&format!(
        "UPDATE trips SET photos = $2, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {}",
        TRIP_COLUMNS
    ))
    .bind(id)
    .bind(photos)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM trips WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
