// Trait seams for the scrape pipeline's external collaborators.
//
// ScrapeProvider: the external, eventually-consistent scraping service.
// RunStore: `runner_scrapers` persistence (registry + completion marker).
// CreativeStore: the two ad-creative tables plus competitor profile lookup.
// MediaFetcher: a single media download attempt (retry policy sits above).
// MediaStore: durable object storage for mirrored media.
//
// These enable deterministic testing with in-memory mocks: no network, no
// database, no Docker. `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use adlens_common::{AdCreative, AdType, ScrapeRun};
use apify_client::RawAdItem;

/// One dataset record: the typed view used by classification and transform,
/// paired with the verbatim JSON it was parsed from. The raw value is what
/// gets persisted as the audit snapshot, untouched.
#[derive(Debug, Clone)]
pub struct ScrapedAd {
    pub item: RawAdItem,
    pub raw: serde_json::Value,
}

/// What a poll attempt found.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The provider has not produced results yet.
    Pending,
    /// The run finished and these are its records.
    Items(Vec<ScrapedAd>),
}

#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// Submit a scrape for a target URL. Returns the provider-issued run id.
    async fn submit(&self, target_url: &str) -> Result<String>;

    /// Ask the provider for results. Transient failures should surface as
    /// `Err`; the poller counts them against its attempt budget.
    async fn fetch_results(&self, run_id: &str) -> Result<FetchOutcome>;
}

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a new run record. Overwrites any previous record with the
    /// same run id (product policy: always start fresh).
    async fn create_run(&self, run: &ScrapeRun) -> Result<()>;

    /// The organisation's most recently created run, if any. Activity is
    /// judged on this run alone.
    async fn latest_run(&self, organisation_id: Uuid) -> Result<Option<ScrapeRun>>;

    /// The single authoritative transition out of the active state.
    async fn mark_complete(&self, run_id: &str) -> Result<()>;

    /// Runs that never completed, across all organisations. Operational
    /// visibility for permanently stuck records.
    async fn count_incomplete(&self) -> Result<i64>;
}

#[async_trait]
pub trait CreativeStore: Send + Sync {
    /// Idempotent bulk upsert keyed by `(ad_archive_id, organisation_id)`.
    /// Returns the number of records written.
    async fn bulk_upsert(&self, records: &[AdCreative], ad_type: AdType) -> Result<usize>;

    /// Resolve a competitor profile by its tracked URL, scoped to the
    /// organisation. A miss is not an error.
    async fn competitor_id_for_url(
        &self,
        organisation_id: Uuid,
        url: &str,
    ) -> Result<Option<Uuid>>;
}

/// One downloaded media resource.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download a remote resource once. The mirror owns retries.
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store bytes under a key and return the stable public URL.
    async fn store(&self, key: &str, bytes: Bytes, content_type: Option<&str>) -> Result<String>;
}

#[async_trait]
impl MediaStore for objectstore_client::ObjectStoreClient {
    async fn store(&self, key: &str, bytes: Bytes, content_type: Option<&str>) -> Result<String> {
        Ok(self.put_object(key, bytes, content_type).await?)
    }
}
