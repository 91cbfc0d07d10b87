//! Object-storage client seam
//!
//! The store (MinIO in development, any S3-compatible service elsewhere) is
//! addressed path-style over plain HTTP. The trait exists so the resolver
//! and tests take the client as an injected dependency rather than reaching
//! for a process-wide handle.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Path-style HTTP client for an S3-compatible object store
pub struct HttpObjectStore {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<HttpObjectStore> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build object-store HTTP client")?;
        Ok(HttpObjectStore {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        if !response.status().is_success() {
            bail!("GET {} returned {}", url, response.status());
        }
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.object_url(bucket, key);
        let response = self
            .http
            .put(&url)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;
        if !response.status().is_success() {
            bail!("PUT {} returned {}", url, response.status());
        }
        Ok(())
    }
}
