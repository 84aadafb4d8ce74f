//! Object storage administration (`/storage/v1`).

use crate::client::ApiClient;
use crate::error::{ServiceError, path_segment, require};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

const PREFIX: &str = "/storage/v1";

/// Maximum page size accepted by `list_objects`.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Settings for a new bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBucket {
    pub name: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// Fields changed by `update_bucket`. Unset fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// A page of objects inside a bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectListing {
    pub prefix: String,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ObjectListing {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            limit: 100,
            offset: 0,
        }
    }
}

/// Client for the storage service's bucket and object APIs.
#[derive(Debug, Clone)]
pub struct StorageClient {
    api: ApiClient,
}

impl StorageClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_buckets(&self) -> Result<Value, ServiceError> {
        self.api.get(&format!("{}/bucket", PREFIX)).await
    }

    pub async fn get_bucket(&self, id: &str) -> Result<Value, ServiceError> {
        let id = path_segment(id, "id")?;
        self.api.get(&format!("{}/bucket/{}", PREFIX, id)).await
    }

    pub async fn create_bucket(&self, bucket: &NewBucket) -> Result<Value, ServiceError> {
        let name = path_segment(&bucket.name, "name")?;
        let mut body = json!({
            "id": name,
            "name": name,
            "public": bucket.public,
        });
        if let Some(limit) = bucket.file_size_limit {
            body["file_size_limit"] = json!(limit);
        }
        if let Some(types) = &bucket.allowed_mime_types {
            body["allowed_mime_types"] = json!(types);
        }
        let created = self.api.post(&format!("{}/bucket", PREFIX), &body).await?;
        info!(bucket = %name, public = bucket.public, "Created storage bucket");
        Ok(created)
    }

    pub async fn update_bucket(&self, id: &str, update: &BucketUpdate) -> Result<Value, ServiceError> {
        let id = path_segment(id, "id")?;
        if update.public.is_none()
            && update.file_size_limit.is_none()
            && update.allowed_mime_types.is_none()
        {
            return Err(ServiceError::Validation(
                "update_bucket needs at least one of public, file_size_limit, allowed_mime_types"
                    .to_string(),
            ));
        }
        let mut body = serde_json::to_value(update)
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        body["id"] = json!(id);
        self.api.put(&format!("{}/bucket/{}", PREFIX, id), &body).await
    }

    /// Delete a bucket. The storage service refuses non-empty buckets.
    pub async fn delete_bucket(&self, id: &str) -> Result<Value, ServiceError> {
        let id = path_segment(id, "id")?;
        let deleted = self.api.delete(&format!("{}/bucket/{}", PREFIX, id), None).await?;
        info!(bucket = %id, "Deleted storage bucket");
        Ok(deleted)
    }

    /// Remove every object in a bucket.
    pub async fn empty_bucket(&self, id: &str) -> Result<Value, ServiceError> {
        let id = path_segment(id, "id")?;
        let emptied = self
            .api
            .post(&format!("{}/bucket/{}/empty", PREFIX, id), &json!({}))
            .await?;
        info!(bucket = %id, "Emptied storage bucket");
        Ok(emptied)
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        listing: &ObjectListing,
    ) -> Result<Value, ServiceError> {
        let bucket = path_segment(bucket, "bucket")?;
        if listing.limit == 0 || listing.limit > MAX_LIST_LIMIT {
            return Err(ServiceError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            )));
        }
        let body = json!({
            "prefix": listing.prefix,
            "limit": listing.limit,
            "offset": listing.offset,
            "sortBy": { "column": "name", "order": "asc" },
        });
        self.api
            .post(&format!("{}/object/list/{}", PREFIX, bucket), &body)
            .await
    }

    /// Delete objects by path. Returns the objects the service removed.
    pub async fn delete_objects(&self, bucket: &str, paths: &[String]) -> Result<Value, ServiceError> {
        let bucket = path_segment(bucket, "bucket")?;
        if paths.is_empty() {
            return Err(ServiceError::Validation("paths must not be empty".to_string()));
        }
        for path in paths {
            require(path, "path")?;
        }
        let removed = self
            .api
            .delete(
                &format!("{}/object/{}", PREFIX, bucket),
                Some(&json!({ "prefixes": paths })),
            )
            .await?;
        info!(bucket = %bucket, count = paths.len(), "Deleted storage objects");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorder, api_for};
    use axum::http::StatusCode;

    fn storage(base: &str) -> StorageClient {
        StorageClient::new(api_for(base))
    }

    #[tokio::test]
    async fn test_create_bucket_sends_settings() {
        let recorder = Recorder::new(StatusCode::OK, json!({"name": "avatars"}));
        let base = recorder.spawn().await;

        let created = storage(&base)
            .create_bucket(&NewBucket {
                name: "avatars".into(),
                public: true,
                file_size_limit: Some(1024),
                allowed_mime_types: Some(vec!["image/png".into()]),
            })
            .await
            .unwrap();
        assert_eq!(created["name"], "avatars");

        let request = recorder.last();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/storage/v1/bucket");
        assert_eq!(request.body["id"], "avatars");
        assert_eq!(request.body["public"], true);
        assert_eq!(request.body["file_size_limit"], 1024);
        assert_eq!(request.body["allowed_mime_types"][0], "image/png");
    }

    #[tokio::test]
    async fn test_list_objects_defaults_and_limits() {
        let recorder = Recorder::new(StatusCode::OK, json!([{"name": "a.png"}]));
        let base = recorder.spawn().await;
        let client = storage(&base);

        let objects = client.list_objects("avatars", &ObjectListing::default()).await.unwrap();
        assert_eq!(objects[0]["name"], "a.png");
        let request = recorder.last();
        assert_eq!(request.path, "/storage/v1/object/list/avatars");
        assert_eq!(request.body["limit"], 100);
        assert_eq!(request.body["offset"], 0);
        assert_eq!(request.body["prefix"], "");

        let too_many = ObjectListing {
            limit: 5000,
            ..Default::default()
        };
        assert!(client.list_objects("avatars", &too_many).await.unwrap_err().is_validation());
        assert_eq!(recorder.count(), 1);
    }

    #[tokio::test]
    async fn test_delete_objects_uses_prefixes_body() {
        let recorder = Recorder::new(StatusCode::OK, json!([{"name": "a.png"}]));
        let base = recorder.spawn().await;

        storage(&base)
            .delete_objects("avatars", &["a.png".to_string(), "dir/b.png".to_string()])
            .await
            .unwrap();
        let request = recorder.last();
        assert_eq!(request.method, "DELETE");
        assert_eq!(request.path, "/storage/v1/object/avatars");
        assert_eq!(request.body["prefixes"], json!(["a.png", "dir/b.png"]));
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_request() {
        let recorder = Recorder::new(StatusCode::OK, json!({}));
        let base = recorder.spawn().await;
        let client = storage(&base);

        assert!(client.get_bucket("../etc").await.unwrap_err().is_validation());
        assert!(client.delete_objects("avatars", &[]).await.unwrap_err().is_validation());
        assert!(
            client
                .update_bucket("avatars", &BucketUpdate::default())
                .await
                .unwrap_err()
                .is_validation()
        );
        assert_eq!(recorder.count(), 0);
    }

    #[tokio::test]
    async fn test_service_rejection_is_surfaced() {
        let recorder = Recorder::new(
            StatusCode::BAD_REQUEST,
            json!({"statusCode": "409", "error": "Duplicate", "message": "The resource already exists"}),
        );
        let base = recorder.spawn().await;

        let err = storage(&base)
            .create_bucket(&NewBucket {
                name: "avatars".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 400: The resource already exists");
    }

    #[tokio::test]
    async fn test_update_and_empty_paths() {
        let recorder = Recorder::new(StatusCode::OK, json!({"message": "Successfully updated"}));
        let base = recorder.spawn().await;
        let client = storage(&base);

        client
            .update_bucket(
                "avatars",
                &BucketUpdate {
                    public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let request = recorder.last();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/storage/v1/bucket/avatars");
        assert_eq!(request.body, json!({"id": "avatars", "public": false}));

        client.empty_bucket("avatars").await.unwrap();
        assert_eq!(recorder.last().path, "/storage/v1/bucket/avatars/empty");
    }
}
