use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::trips::repo::Trip;

/// Body for trip create and update. Photos and tags default to empty when
/// omitted; the author is never taken from the body (it comes from the
/// verified token).
#[derive(Debug, Deserialize)]
pub struct TripRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
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

impl From<Trip> for TripResponse {
    fn from(t: Trip) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            photos: t.photos,
            tags: t.tags,
            latitude: t.latitude,
            longitude: t.longitude,
            author_id: t.author_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    /// Radius in kilometers.
    pub radius: f64,
}

#[derive(Debug, Deserialize)]
pub struct DeletePhotoQuery {
    #[serde(rename = "photoUrl")]
    pub photo_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_request_defaults_photos_and_tags() {
        let req: TripRequest = serde_json::from_str(r#"{"title":"Chiang Mai"}"#).unwrap();
        assert_eq!(req.title, "Chiang Mai");
        assert!(req.photos.is_empty());
        assert!(req.tags.is_empty());
        assert!(req.description.is_none());
        assert!(req.latitude.is_none());
    }

    #[test]
    fn delete_photo_query_uses_camel_case_param() {
        let q: DeletePhotoQuery =
            serde_json::from_str(r#"{"photoUrl":"https://x/y.jpg"}"#).unwrap();
        assert_eq!(q.photo_url, "https://x/y.jpg");
    }
}
