pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    AdCard, AdLibraryInput, AdSnapshot, BodyText, ImageEntry, MediaPayload, MediaSets, RawAdItem,
    RunData, StartUrl, VideoEntry,
};

use serde::de::DeserializeOwned;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for the facebook ad-library scraper.
const AD_LIBRARY_SCRAPER: &str = "JJghSZmShuco4j9gJ";

/// Default number of ads requested per run.
const DEFAULT_RESULT_COUNT: u32 = 200;

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Start an ad-library scrape run for a target URL. Returns immediately
    /// with run metadata; results arrive later in the run's dataset.
    pub async fn start_ad_library_run(&self, target_url: &str) -> Result<RunData> {
        let input = AdLibraryInput {
            urls: vec![StartUrl {
                url: target_url.to_string(),
            }],
            scrape_ad_details: true,
            count: DEFAULT_RESULT_COUNT,
        };

        let url = format!("{}/acts/{}/runs", BASE_URL, AD_LIBRARY_SCRAPER);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        tracing::info!(run_id = %api_resp.data.id, target_url, "Apify run started");
        Ok(api_resp.data)
    }

    /// Read the current status of a run. One-shot; the caller owns the
    /// retry/poll policy.
    pub async fn get_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}", BASE_URL, run_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", BASE_URL, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }
}
