use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    auth::repo::User,
    error::ApiError,
    state::AppState,
    storage::object_key,
    trips::{
        dto::TripRequest,
        repo::{self, NewTrip, Trip, TripUpdate},
    },
};

pub const MAX_PHOTOS: usize = 5;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// One file from the multipart `photos` field.
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

fn check_owner(trip: &Trip, user_id: i64) -> Result<(), ApiError> {
    if trip.author_id != Some(user_id) {
        return Err(ApiError::Forbidden(
            "you do not have permission to modify this trip".into(),
        ));
    }
    Ok(())
}

/// A lone coordinate is meaningless; require both or neither.
fn check_location(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ApiError> {
    if latitude.is_some() != longitude.is_some() {
        return Err(ApiError::Validation(
            "latitude and longitude must be provided together".into(),
        ));
    }
    Ok(())
}

fn check_photo_capacity(current: usize, adding: usize) -> Result<(), ApiError> {
    if current + adding > MAX_PHOTOS {
        return Err(ApiError::Validation(format!(
            "at most {} photos per trip (currently {})",
            MAX_PHOTOS, current
        )));
    }
    Ok(())
}

fn validate_photo(file: &PhotoUpload) -> Result<(), ApiError> {
    if file.body.is_empty() {
        return Err(ApiError::Validation("file is empty".into()));
    }
    if file.body.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation(format!(
            "file too large (max {} MB)",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }
    let ct = file.content_type.to_lowercase();
    if !ALLOWED_TYPES.contains(&ct.as_str()) {
        return Err(ApiError::Validation(format!(
            "unsupported file type, allowed: {}",
            ALLOWED_TYPES.join(", ")
        )));
    }
    Ok(())
}

async fn load_trip(state: &AppState, trip_id: i64) -> Result<Trip, ApiError> {
    repo::find_by_id(&state.db, trip_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("trip not found".into()))
}

pub async fn create_trip(
    state: &AppState,
    req: &TripRequest,
    author_id: i64,
) -> Result<Trip, ApiError> {
    check_location(req.latitude, req.longitude)?;
    check_photo_capacity(0, req.photos.len())?;

    // The author must still exist; tokens can outlive accounts.
    if User::find_by_id(&state.db, author_id).await?.is_none() {
        return Err(ApiError::NotFound("author not found".into()));
    }

    let trip = repo::insert(
        &state.db,
        NewTrip {
            title: &req.title,
            description: req.description.as_deref(),
            photos: &req.photos,
            tags: &req.tags,
            latitude: req.latitude,
            longitude: req.longitude,
            author_id,
        },
    )
    .await?;

    info!(trip_id = trip.id, author_id, "trip created");
    Ok(trip)
}

pub async fn update_trip(
    state: &AppState,
    trip_id: i64,
    req: &TripRequest,
    user_id: i64,
) -> Result<Trip, ApiError> {
    check_location(req.latitude, req.longitude)?;
    check_photo_capacity(0, req.photos.len())?;

    let trip = load_trip(state, trip_id).await?;
    check_owner(&trip, user_id)?;

    let trip = repo::update(
        &state.db,
        trip_id,
        TripUpdate {
            title: &req.title,
            description: req.description.as_deref(),
            photos: &req.photos,
            tags: &req.tags,
            latitude: req.latitude,
            longitude: req.longitude,
        },
    )
    .await?;

    info!(trip_id, user_id, "trip updated");
    Ok(trip)
}

pub async fn delete_trip(state: &AppState, trip_id: i64, user_id: i64) -> Result<(), ApiError> {
    let trip = load_trip(state, trip_id).await?;
    check_owner(&trip, user_id)?;

    // Best-effort blob cleanup: a storage fault must not block the row delete.
    for url in &trip.photos {
        if let Err(e) = state.storage.delete_by_url(url).await {
            warn!(trip_id, url = %url, error = %e, "failed to delete photo blob");
        }
    }

    repo::delete(&state.db, trip_id).await?;
    info!(trip_id, user_id, "trip deleted");
    Ok(())
}

pub async fn upload_photos(
    state: &AppState,
    trip_id: i64,
    files: Vec<PhotoUpload>,
    user_id: i64,
) -> Result<Trip, ApiError> {
    let trip = load_trip(state, trip_id).await?;
    check_owner(&trip, user_id)?;
    check_photo_capacity(trip.photos.len(), files.len())?;

    // Validate-then-upload per file, in order. An invalid file aborts the
    // batch before any later file goes out; already-uploaded files are not
    // rolled back.
    let mut new_urls = Vec::with_capacity(files.len());
    for file in &files {
        validate_photo(file)?;
        let key = object_key(trip_id, file.file_name.as_deref(), &file.content_type);
        let url = state
            .storage
            .upload(&key, file.body.clone(), &file.content_type)
            .await?;
        new_urls.push(url);
    }

    let mut photos = trip.photos;
    photos.extend(new_urls);
    let trip = repo::set_photos(&state.db, trip_id, &photos).await?;

    info!(trip_id, user_id, count = files.len(), "photos uploaded");
    Ok(trip)
}

pub async fn delete_photo(
    state: &AppState,
    trip_id: i64,
    photo_url: &str,
    user_id: i64,
) -> Result<Trip, ApiError> {
    let trip = load_trip(state, trip_id).await?;
    check_owner(&trip, user_id)?;

    if trip.photos.is_empty() {
        return Err(ApiError::Validation("trip has no photos".into()));
    }
    if !trip.photos.iter().any(|p| p == photo_url) {
        return Err(ApiError::NotFound("photo not found in trip".into()));
    }

    // Best-effort on the blob; the URL is removed from the row regardless.
    if let Err(e) = state.storage.delete_by_url(photo_url).await {
        warn!(trip_id, url = %photo_url, error = %e, "failed to delete photo blob");
    }

    let photos: Vec<String> = trip
        .photos
        .into_iter()
        .filter(|p| p != photo_url)
        .collect();
    let trip = repo::set_photos(&state.db, trip_id, &photos).await?;

    info!(trip_id, user_id, "photo removed");
    Ok(trip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn trip_owned_by(author_id: Option<i64>) -> Trip {
        Trip {
            id: 1,
            title: "Chiang Mai".into(),
            description: None,
            photos: vec![],
            tags: vec![],
            latitude: None,
            longitude: None,
            author_id,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn photo(body: &[u8], ct: &str) -> PhotoUpload {
        PhotoUpload {
            file_name: Some("p.jpg".into()),
            content_type: ct.into(),
            body: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn owner_check_is_strict_equality() {
        let trip = trip_owned_by(Some(1));
        assert!(check_owner(&trip, 1).is_ok());
        assert!(matches!(
            check_owner(&trip, 2),
            Err(ApiError::Forbidden(_))
        ));
        // Orphaned trip (author deleted): nobody owns it.
        let orphan = trip_owned_by(None);
        assert!(matches!(
            check_owner(&orphan, 1),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn location_must_be_both_or_neither() {
        assert!(check_location(None, None).is_ok());
        assert!(check_location(Some(18.79), Some(98.98)).is_ok());
        assert!(matches!(
            check_location(Some(18.79), None),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            check_location(None, Some(98.98)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn photo_capacity_is_capped_at_five() {
        assert!(check_photo_capacity(0, 5).is_ok());
        assert!(check_photo_capacity(4, 1).is_ok());
        let err = check_photo_capacity(0, 6).unwrap_err();
        assert!(err.to_string().contains('5'));
        assert!(check_photo_capacity(3, 3).is_err());
        assert!(check_photo_capacity(5, 1).is_err());
    }

    #[test]
    fn capacity_error_reports_current_count() {
        let err = check_photo_capacity(4, 2).unwrap_err();
        assert!(err.to_string().contains("currently 4"));
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = validate_photo(&photo(b"", "image/png")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let big = vec![0u8; MAX_FILE_SIZE + 1];
        let err = validate_photo(&photo(&big, "image/png")).unwrap_err();
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn file_at_size_limit_is_accepted() {
        let at_limit = vec![0u8; MAX_FILE_SIZE];
        assert!(validate_photo(&photo(&at_limit, "image/jpeg")).is_ok());
    }

    #[test]
    fn content_type_allowlist() {
        assert!(validate_photo(&photo(b"x", "image/jpeg")).is_ok());
        assert!(validate_photo(&photo(b"x", "image/jpg")).is_ok());
        assert!(validate_photo(&photo(b"x", "image/png")).is_ok());
        assert!(validate_photo(&photo(b"x", "image/webp")).is_ok());
        assert!(validate_photo(&photo(b"x", "IMAGE/PNG")).is_ok());
        assert!(validate_photo(&photo(b"x", "image/gif")).is_err());
        assert!(validate_photo(&photo(b"x", "application/pdf")).is_err());
    }
}
