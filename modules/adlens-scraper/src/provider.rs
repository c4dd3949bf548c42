use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use apify_client::{ApifyClient, RawAdItem};

use crate::traits::{FetchOutcome, ScrapeProvider, ScrapedAd};

/// Production `ScrapeProvider` backed by the Apify ad-library actor.
pub struct ApifyProvider {
    client: ApifyClient,
}

impl ApifyProvider {
    pub fn new(client: ApifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScrapeProvider for ApifyProvider {
    async fn submit(&self, target_url: &str) -> Result<String> {
        let run = self.client.start_ad_library_run(target_url).await?;
        Ok(run.id)
    }

    async fn fetch_results(&self, run_id: &str) -> Result<FetchOutcome> {
        let run = self.client.get_run(run_id).await?;

        if run.succeeded() {
            // Dataset items are fetched as raw JSON so the verbatim record
            // can be persisted for audit; the typed view is parsed beside it.
            let values: Vec<serde_json::Value> =
                self.client.get_dataset_items(&run.default_dataset_id).await?;
            let mut records = Vec::with_capacity(values.len());
            for raw in values {
                match serde_json::from_value::<RawAdItem>(raw.clone()) {
                    Ok(item) => records.push(ScrapedAd { item, raw }),
                    Err(e) => {
                        warn!(run_id, error = %e, "Skipping undecodable dataset record");
                    }
                }
            }
            return Ok(FetchOutcome::Items(records));
        }

        if run.failed() {
            // Surfaced as an error so the poller counts it against the
            // attempt budget like any transient fetch failure.
            anyhow::bail!("provider run {} ended with status {}", run_id, run.status);
        }

        Ok(FetchOutcome::Pending)
    }
}
