use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header;
use tracing::{debug, info, warn};
use uuid::Uuid;

use adlens_common::AdType;

use crate::traits::{FetchedMedia, MediaFetcher, MediaStore};

/// Max download attempts per URL: one initial try plus two retries.
const MAX_RETRIES: u32 = 2;

/// Mirror tuning. Defaults trade throughput for not overwhelming the source
/// CDN or the storage backend.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// URLs processed concurrently per batch.
    pub concurrency: usize,
    /// Pause between batches.
    pub batch_pause: Duration,
    /// Base retry backoff; doubles per attempt, capped at `max_backoff`.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            batch_pause: Duration::from_millis(500),
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Outcome of one mirroring pass. Failures are collected, never raised:
/// any URL without a mapping entry keeps its original remote value in the
/// persisted record.
#[derive(Debug, Default)]
pub struct MirrorOutcome {
    pub successful: Vec<String>,
    pub failed: Vec<String>,
    pub url_mapping: HashMap<String, String>,
}

/// Downloads remote media and re-hosts it in owned durable storage.
pub struct MediaMirror {
    fetcher: Arc<dyn MediaFetcher>,
    store: Arc<dyn MediaStore>,
    config: MirrorConfig,
}

impl MediaMirror {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, store: Arc<dyn MediaStore>) -> Self {
        Self::with_config(fetcher, store, MirrorConfig::default())
    }

    pub fn with_config(
        fetcher: Arc<dyn MediaFetcher>,
        store: Arc<dyn MediaStore>,
        config: MirrorConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    /// Mirror a set of remote URLs into object storage under
    /// `{organisation_id}/{ad_type}/`. Input is deduplicated before any
    /// network call; per-URL failures never abort the pass.
    pub async fn mirror(
        &self,
        urls: &[String],
        organisation_id: Uuid,
        ad_type: AdType,
    ) -> MirrorOutcome {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = urls.iter().filter(|u| seen.insert(u.as_str())).collect();

        let mut outcome = MirrorOutcome::default();
        let total_batches = unique.len().div_ceil(self.config.concurrency.max(1));

        for (batch_idx, batch) in unique.chunks(self.config.concurrency.max(1)).enumerate() {
            let futures = batch
                .iter()
                .map(|url| self.mirror_one(url, organisation_id, ad_type));
            let results = futures::future::join_all(futures).await;

            for (url, result) in batch.iter().zip(results) {
                match result {
                    Ok(mirrored) => {
                        outcome.url_mapping.insert((*url).clone(), mirrored);
                        outcome.successful.push((*url).clone());
                    }
                    Err(e) => {
                        warn!(url = url.as_str(), error = %e, "Media mirror failed for URL");
                        outcome.failed.push((*url).clone());
                    }
                }
            }

            if batch_idx + 1 < total_batches {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        info!(
            requested = urls.len(),
            unique = unique.len(),
            mirrored = outcome.successful.len(),
            failed = outcome.failed.len(),
            "Media mirror pass finished"
        );
        outcome
    }

    async fn mirror_one(
        &self,
        url: &str,
        organisation_id: Uuid,
        ad_type: AdType,
    ) -> Result<String> {
        let parsed = url::Url::parse(url).context("malformed media URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("unsupported URL scheme: {}", parsed.scheme());
        }

        let media = self.download_with_retry(url).await?;

        let ext = file_extension(&parsed, media.content_type.as_deref());
        let key = match ext {
            Some(ext) => format!(
                "{}/{}/{}.{}",
                organisation_id,
                ad_type.key_segment(),
                Uuid::new_v4(),
                ext
            ),
            None => format!(
                "{}/{}/{}",
                organisation_id,
                ad_type.key_segment(),
                Uuid::new_v4()
            ),
        };

        let stored = self
            .store
            .store(&key, media.bytes, media.content_type.as_deref())
            .await?;
        debug!(url, key, "Mirrored media object");
        Ok(stored)
    }

    async fn download_with_retry(&self, url: &str) -> Result<FetchedMedia> {
        let mut attempt = 0u32;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(media) => return Ok(media),
                Err(e) if attempt < MAX_RETRIES => {
                    let backoff = (self.config.base_backoff * 2u32.pow(attempt))
                        .min(self.config.max_backoff);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                    warn!(
                        url,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Media download failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Derive a file extension from the URL path, falling back to the response
/// content type. Mirrored names stay recognizable to downstream consumers.
fn file_extension(url: &url::Url, content_type: Option<&str>) -> Option<String> {
    let from_path = url
        .path()
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    from_path.or_else(|| {
        let ct = content_type?.split(';').next()?.trim();
        let ext = match ct {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/avif" => "avif",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            _ => return None,
        };
        Some(ext.to_string())
    })
}

// --- Production fetcher ---

/// Browser-like desktop Chrome profile. Some ad CDNs only serve media to
/// clients that look like a real browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub struct ReqwestMediaFetcher {
    client: reqwest::Client,
}

impl ReqwestMediaFetcher {
    pub fn new() -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("image/avif,image/webp,video/*,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for ReqwestMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for ReqwestMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let resp = self.client.get(url).send().await.context("media request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("media download returned status {status}");
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes().await.context("media body read failed")?;

        Ok(FetchedMedia {
            bytes,
            content_type,
        })
    }
}
