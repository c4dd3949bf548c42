// Test mocks for the scrape pipeline.
//
// One mock per trait boundary:
// - MockProvider (ScrapeProvider): scripted fetch outcomes per attempt
// - MemoryRunStore (RunStore): in-memory `runner_scrapers`
// - MemoryCreativeStore (CreativeStore): in-memory creatives keyed by
//   (ad_archive_id, organisation_id, ad_type)
// - MockMediaFetcher (MediaFetcher): per-URL scripted download results
// - MemoryMediaStore (MediaStore): records keys, returns stable test URLs
//
// Plus a Harness wiring all of them into a scheduler + gate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use adlens_common::{AdCreative, AdType, ScrapeRun};

use crate::gate::SubmissionGate;
use crate::mirror::{MediaMirror, MirrorConfig};
use crate::pipeline::{ResultPipeline, RunContext};
use crate::scheduler::{PollConfig, PollScheduler};
use crate::traits::{
    CreativeStore, FetchOutcome, FetchedMedia, MediaFetcher, MediaStore, RunStore, ScrapeProvider,
    ScrapedAd,
};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Pair a JSON value with its parsed typed view, like the provider does.
pub fn scraped(raw: serde_json::Value) -> ScrapedAd {
    let item = serde_json::from_value(raw.clone()).expect("test raw item must deserialize");
    ScrapedAd { item, raw }
}

/// A minimal valid raw record: one archive id, one original image.
pub fn raw_item_with_image(archive_id: &str, image_url: &str) -> ScrapedAd {
    scraped(serde_json::json!({
        "ad_archive_id": archive_id,
        "page_name": "Test Page",
        "snapshot": { "images": [image_url] }
    }))
}

/// A raw record that passes identifier validation but has no media.
pub fn raw_item_without_media(archive_id: &str) -> ScrapedAd {
    scraped(serde_json::json!({
        "ad_archive_id": archive_id,
        "snapshot": {}
    }))
}

pub fn run_context(run_id: &str, ad_type: AdType) -> RunContext {
    RunContext {
        run_id: run_id.to_string(),
        organisation_id: Uuid::new_v4(),
        target_url: "https://shoeco.com".to_string(),
        ad_type,
    }
}

/// Mirror config with near-zero delays so retry paths stay fast in tests.
pub fn fast_mirror_config() -> MirrorConfig {
    MirrorConfig {
        concurrency: 3,
        batch_pause: Duration::from_millis(1),
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

enum ScriptedFetch {
    Pending,
    Items(Vec<ScrapedAd>),
    Error(String),
}

/// Scripted provider. `fetch_results` consumes one scripted outcome per
/// call; once the script is exhausted every further call is Pending.
pub struct MockProvider {
    run_id: String,
    fail_submit: bool,
    script: Mutex<VecDeque<ScriptedFetch>>,
    submitted: Mutex<Vec<String>>,
    fetch_calls: Mutex<usize>,
}

impl MockProvider {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            fail_submit: false,
            script: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            fetch_calls: Mutex::new(0),
        }
    }

    pub fn failing_submit() -> Self {
        let mut p = Self::new("unused");
        p.fail_submit = true;
        p
    }

    pub fn then_pending(self) -> Self {
        self.script.lock().unwrap().push_back(ScriptedFetch::Pending);
        self
    }

    pub fn then_items(self, items: Vec<ScrapedAd>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedFetch::Items(items));
        self
    }

    pub fn then_error(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedFetch::Error(message.to_string()));
        self
    }

    pub fn fetch_attempts(&self) -> usize {
        *self.fetch_calls.lock().unwrap()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScrapeProvider for MockProvider {
    async fn submit(&self, target_url: &str) -> Result<String> {
        if self.fail_submit {
            bail!("provider rejected submission for {target_url}");
        }
        self.submitted.lock().unwrap().push(target_url.to_string());
        Ok(self.run_id.clone())
    }

    async fn fetch_results(&self, _run_id: &str) -> Result<FetchOutcome> {
        *self.fetch_calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(ScriptedFetch::Pending) | None => Ok(FetchOutcome::Pending),
            Some(ScriptedFetch::Items(items)) => Ok(FetchOutcome::Items(items)),
            Some(ScriptedFetch::Error(message)) => bail!("{message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryRunStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<String, ScrapeRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, run_id: &str) -> Option<ScrapeRun> {
        self.runs.lock().unwrap().get(run_id).cloned()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create_run(&self, run: &ScrapeRun) -> Result<()> {
        self.runs
            .lock()
            .unwrap()
            .insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    async fn latest_run(&self, organisation_id: Uuid) -> Result<Option<ScrapeRun>> {
        Ok(self
            .runs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.organisation_id == organisation_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn mark_complete(&self, run_id: &str) -> Result<()> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| anyhow::anyhow!("unknown run {run_id}"))?;
        run.completed_at = Some(Utc::now());
        run.ads_scraped = true;
        Ok(())
    }

    async fn count_incomplete(&self) -> Result<i64> {
        Ok(self
            .runs
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_active())
            .count() as i64)
    }
}

// ---------------------------------------------------------------------------
// MemoryCreativeStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCreativeStore {
    rows: Mutex<HashMap<(String, Uuid, AdType), AdCreative>>,
    upsert_batches: Mutex<Vec<usize>>,
    competitor_urls: Mutex<HashMap<(Uuid, String), Uuid>>,
    fail_upserts: AtomicBool,
}

impl MemoryCreativeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_competitor(self, organisation_id: Uuid, url: &str, id: Uuid) -> Self {
        self.competitor_urls
            .lock()
            .unwrap()
            .insert((organisation_id, url.to_string()), id);
        self
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::Relaxed);
    }

    pub fn row(&self, archive_id: &str, organisation_id: Uuid, ad_type: AdType) -> Option<AdCreative> {
        self.rows
            .lock()
            .unwrap()
            .get(&(archive_id.to_string(), organisation_id, ad_type))
            .cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Number of bulk_upsert calls made (fast + durable passes).
    pub fn upsert_calls(&self) -> usize {
        self.upsert_batches.lock().unwrap().len()
    }
}

#[async_trait]
impl CreativeStore for MemoryCreativeStore {
    async fn bulk_upsert(&self, records: &[AdCreative], ad_type: AdType) -> Result<usize> {
        if self.fail_upserts.load(Ordering::Relaxed) {
            bail!("simulated upsert failure");
        }
        let mut rows = self.rows.lock().unwrap();
        for rec in records {
            rows.insert(
                (rec.ad_archive_id.clone(), rec.organisation_id, ad_type),
                rec.clone(),
            );
        }
        self.upsert_batches.lock().unwrap().push(records.len());
        Ok(records.len())
    }

    async fn competitor_id_for_url(
        &self,
        organisation_id: Uuid,
        url: &str,
    ) -> Result<Option<Uuid>> {
        Ok(self
            .competitor_urls
            .lock()
            .unwrap()
            .get(&(organisation_id, url.to_string()))
            .copied())
    }
}

// ---------------------------------------------------------------------------
// MockMediaFetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FetcherState {
    ok_urls: HashSet<String>,
    /// Remaining failures before an URL starts succeeding.
    flaky: HashMap<String, u32>,
    calls: HashMap<String, usize>,
}

/// Per-URL scripted downloads. Unregistered URLs always fail. Clones share
/// state so tests can assert call counts after handing the fetcher off.
#[derive(Clone, Default)]
pub struct MockMediaFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str) -> Self {
        self.state.lock().unwrap().ok_urls.insert(url.to_string());
        self
    }

    pub fn fail_then_ok(self, url: &str, failures: u32) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.ok_urls.insert(url.to_string());
            state.flaky.insert(url.to_string(), failures);
        }
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(url.to_string()).or_insert(0) += 1;

        if let Some(remaining) = state.flaky.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!("simulated transient download failure for {url}");
            }
        }
        if state.ok_urls.contains(url) {
            return Ok(FetchedMedia {
                bytes: Bytes::from_static(b"test media bytes"),
                content_type: Some("image/jpeg".to_string()),
            });
        }
        bail!("unreachable URL {url}");
    }
}

// ---------------------------------------------------------------------------
// MemoryMediaStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryMediaStore {
    keys: Mutex<Vec<String>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    pub fn object_count(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn store(&self, key: &str, _bytes: Bytes, _content_type: Option<&str>) -> Result<String> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(format!("https://storage.test/{key}"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Full pipeline wiring over mocks: gate → scheduler → pipeline → stores.
pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub runs: Arc<MemoryRunStore>,
    pub creatives: Arc<MemoryCreativeStore>,
    pub fetcher: MockMediaFetcher,
    pub media: Arc<MemoryMediaStore>,
    pub scheduler: Arc<PollScheduler>,
    pub gate: SubmissionGate,
}

pub fn harness(provider: MockProvider, poll: PollConfig) -> Harness {
    harness_with(provider, poll, MemoryCreativeStore::new(), MockMediaFetcher::new())
}

pub fn harness_with(
    provider: MockProvider,
    poll: PollConfig,
    creatives: MemoryCreativeStore,
    fetcher: MockMediaFetcher,
) -> Harness {
    let provider = Arc::new(provider);
    let runs = Arc::new(MemoryRunStore::new());
    let creatives = Arc::new(creatives);
    let media = Arc::new(MemoryMediaStore::new());

    let mirror = MediaMirror::with_config(
        Arc::new(fetcher.clone()),
        media.clone(),
        fast_mirror_config(),
    );
    let pipeline = Arc::new(ResultPipeline::new(
        creatives.clone(),
        runs.clone(),
        mirror,
    ));
    let scheduler = PollScheduler::new(provider.clone(), pipeline, poll);
    let gate = SubmissionGate::new(provider.clone(), runs.clone(), scheduler.clone());

    Harness {
        provider,
        runs,
        creatives,
        fetcher,
        media,
        scheduler,
        gate,
    }
}

/// Poll the scheduler until every loop has drained (or the deadline hits).
pub async fn wait_until_idle(scheduler: &PollScheduler, deadline: Duration) {
    let start = std::time::Instant::now();
    while scheduler.status().active_count > 0 {
        if start.elapsed() > deadline {
            panic!("scheduler did not drain within {deadline:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
