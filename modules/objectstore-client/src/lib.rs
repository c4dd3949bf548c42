pub mod error;

pub use error::{ObjectStoreError, Result};

use std::time::Duration;

use bytes::Bytes;

/// Minimal client for an S3-compatible object store exposed through an
/// authenticated PUT API. Uploads land under a single bucket; reads go
/// through a public base URL.
pub struct ObjectStoreClient {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_key: String,
    public_base_url: String,
}

impl ObjectStoreClient {
    pub fn new(endpoint: &str, bucket: &str, api_key: &str, public_base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            api_key: api_key.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Upload an object and return its public URL.
    pub async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);

        let mut req = self
            .client
            .put(&url)
            .bearer_auth(&self.api_key)
            .body(body);
        if let Some(ct) = content_type {
            req = req.header("Content-Type", ct);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let public_url = self.public_url(key);
        tracing::debug!(key, url = %public_url, "Object stored");
        Ok(public_url)
    }

    /// Public URL for a stored key.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }
}
