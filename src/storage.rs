use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Remote blob store. Uploads return the public URL the object will be
/// served from; deletes take that same URL back.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn delete_by_url(&self, public_url: &str) -> anyhow::Result<()>;
}

/// S3-compatible implementation (the storage service the original app used
/// exposes an S3 endpoint; path-style addressing keeps MinIO working too).
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base_url: cfg.public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("put_object {}", key))?;
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete_by_url(&self, public_url: &str) -> anyhow::Result<()> {
        let key = key_from_url(public_url, &self.bucket)
            .with_context(|| format!("no object key in url {}", public_url))?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("delete_object {}", key))?;
        Ok(())
    }
}

/// Object key for a trip photo: `trips/{trip_id}/{uuid}.{ext}`. The
/// extension comes from the client file name, falling back to the MIME type.
pub fn object_key(trip_id: i64, file_name: Option<&str>, content_type: &str) -> String {
    let ext = file_name
        .and_then(|n| n.rsplit_once('.').map(|(_, e)| e))
        .filter(|e| !e.is_empty())
        .or_else(|| ext_from_mime(content_type));
    match ext {
        Some(ext) => format!("trips/{}/{}.{}", trip_id, Uuid::new_v4(), ext),
        None => format!("trips/{}/{}", trip_id, Uuid::new_v4()),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Recover the object key from a public URL: everything after the last
/// `{bucket}/` segment.
pub fn key_from_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("{}/", bucket);
    url.rfind(&marker)
        .map(|i| url[i + marker.len()..].to_string())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_uses_file_extension() {
        let key = object_key(42, Some("beach.JPG"), "image/jpeg");
        assert!(key.starts_with("trips/42/"));
        assert!(key.ends_with(".JPG"));
    }

    #[test]
    fn object_key_falls_back_to_mime() {
        let key = object_key(7, Some("noext"), "image/webp");
        assert!(key.starts_with("trips/7/"));
        assert!(key.ends_with(".webp"));

        let key = object_key(7, None, "image/png");
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn object_key_without_extension_or_known_mime() {
        let key = object_key(1, None, "application/octet-stream");
        assert!(key.starts_with("trips/1/"));
        assert!(!key.contains('.'));
    }

    #[test]
    fn object_keys_are_unique_per_call() {
        let a = object_key(1, Some("a.png"), "image/png");
        let b = object_key(1, Some("a.png"), "image/png");
        assert_ne!(a, b);
    }

    #[test]
    fn key_from_url_strips_base_and_bucket() {
        let url = "https://store.example.com/photos/trips/3/abc.jpg";
        assert_eq!(
            key_from_url(url, "photos").as_deref(),
            Some("trips/3/abc.jpg")
        );
    }

    #[test]
    fn key_from_url_rejects_foreign_urls() {
        assert_eq!(key_from_url("https://elsewhere/x.jpg", "photos"), None);
        assert_eq!(key_from_url("https://host/photos/", "photos"), None);
    }
}
