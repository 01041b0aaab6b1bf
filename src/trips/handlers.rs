use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    state::AppState,
    trips::{
        dto::{DeletePhotoQuery, NearbyQuery, SearchQuery, TagQuery, TripRequest, TripResponse},
        repo,
        service::{self, PhotoUpload, MAX_FILE_SIZE, MAX_PHOTOS},
    },
};

pub fn trip_routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/search", get(search_trips))
        .route("/trips/by-tag", get(trips_by_tag))
        .route("/trips/nearby", get(trips_nearby))
        .route("/trips/mine", get(my_trips))
        .route(
            "/trips/:id",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
        .route("/trips/:id/photos", post(upload_photos).delete(delete_photo))
        // Room for a full photo batch plus multipart overhead.
        .layer(DefaultBodyLimit::max(MAX_PHOTOS * MAX_FILE_SIZE + 1024 * 1024))
}

// --- visitor endpoints ---

#[instrument(skip(state))]
pub async fn list_trips(
    State(state): State<AppState>,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let trips = repo::list_all(&state.db).await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn search_trips(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let trips = repo::search_by_keyword(&state.db, &q.keyword).await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn trips_by_tag(
    State(state): State<AppState>,
    Query(q): Query<TagQuery>,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let trips = repo::find_by_tag(&state.db, &q.tag).await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn trips_nearby(
    State(state): State<AppState>,
    Query(q): Query<NearbyQuery>,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    if q.radius <= 0.0 {
        return Err(ApiError::Validation("radius must be positive".into()));
    }
    let trips = repo::find_nearby(&state.db, q.lat, q.lng, q.radius).await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("trip not found".into()))?;
    Ok(Json(trip.into()))
}

// --- authenticated endpoints ---

#[instrument(skip(state, caller))]
pub async fn my_trips(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let trips = repo::list_by_author(&state.db, caller.id).await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

#[instrument(skip(state, caller, payload))]
pub async fn create_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<TripRequest>,
) -> Result<(StatusCode, Json<TripResponse>), ApiError> {
    let trip = service::create_trip(&state, &payload, caller.id).await?;
    Ok((StatusCode::CREATED, Json(trip.into())))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<TripRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip = service::update_trip(&state, id, &payload, caller.id).await?;
    Ok(Json(trip.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_trip(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    service::delete_trip(&state, id, caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, caller, mp))]
pub async fn upload_photos(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
    mut mp: Multipart,
) -> Result<Json<TripResponse>, ApiError> {
    let mut files: Vec<PhotoUpload> = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|s| s.to_string());
        if name.as_deref() != Some("photos") && name.as_deref() != Some("photos[]") {
            continue;
        }
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body: Bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("failed to read file: {}", e)))?;
        files.push(PhotoUpload {
            file_name,
            content_type,
            body,
        });
    }
    if files.is_empty() {
        return Err(ApiError::Validation("multipart field 'photos' is required".into()));
    }

    let trip = service::upload_photos(&state, id, files, caller.id).await?;
    Ok(Json(trip.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_photo(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
    Query(q): Query<DeletePhotoQuery>,
) -> Result<Json<TripResponse>, ApiError> {
    let trip = service::delete_photo(&state, id, &q.photo_url, caller.id).await?;
    Ok(Json(trip.into()))
}
