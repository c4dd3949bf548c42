use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which creatives table a scraped ad belongs to: ads run by a tracked
/// competitor, or the organisation's own ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    Competitor,
    SelfOwned,
}

impl AdType {
    /// Table the persistence sink upserts into.
    pub fn table(&self) -> &'static str {
        match self {
            AdType::Competitor => "competitor_ad_creatives",
            AdType::SelfOwned => "self_ad_creatives",
        }
    }

    /// Path segment used to namespace mirrored media keys.
    pub fn key_segment(&self) -> &'static str {
        match self {
            AdType::Competitor => "competitor",
            AdType::SelfOwned => "self",
        }
    }
}

impl std::fmt::Display for AdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_segment())
    }
}

/// One row in `runner_scrapers`: a single scrape attempt against the
/// external provider. Never deleted; doubles as an audit log and as the
/// provenance join key for creatives.
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    /// Opaque identifier issued by the provider at submission time.
    pub run_id: String,
    pub organisation_id: Uuid,
    /// Competitor URL or the organisation's own ad dashboard URL.
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ads_scraped: bool,
}

impl ScrapeRun {
    pub fn new(run_id: impl Into<String>, organisation_id: Uuid, target_url: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            organisation_id,
            target_url: target_url.into(),
            created_at: Utc::now(),
            completed_at: None,
            ads_scraped: false,
        }
    }

    /// A run is active until the poller's success path marks it complete.
    pub fn is_active(&self) -> bool {
        !self.ads_scraped && self.completed_at.is_none()
    }
}

/// A normalized ad creative ready for persistence. Shared shape for both
/// competitor-owned and self-owned ads; `competitor_id` is only resolved
/// for the competitor variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdCreative {
    /// The platform's stable identifier for this ad; conflict key together
    /// with `organisation_id`.
    pub ad_archive_id: String,
    /// Provenance: the scrape run that produced or last touched this row.
    pub run_id: String,
    pub organisation_id: Uuid,
    pub competitor_id: Option<Uuid>,

    // Page metadata
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub page_profile_picture_url: Option<String>,

    // Creative content
    pub title: Option<String>,
    pub body: Option<String>,
    pub link_url: Option<String>,
    pub caption: Option<String>,
    pub cta_text: Option<String>,
    pub display_format: Option<String>,

    // Media URL sets (normalized four-list structure)
    pub resized_image_urls: Vec<String>,
    pub original_image_urls: Vec<String>,
    pub video_hd_urls: Vec<String>,
    pub video_sd_urls: Vec<String>,
    /// Legacy consolidated image list kept for older readers.
    pub image_urls: Vec<String>,

    pub publisher_platforms: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    /// Verbatim provider snapshot, stored for audit/debugging.
    pub raw_data: serde_json::Value,
}

impl AdCreative {
    /// All media URLs this creative references, including the page profile
    /// picture. Input set for the media mirror.
    pub fn media_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        urls.extend(self.resized_image_urls.iter().cloned());
        urls.extend(self.original_image_urls.iter().cloned());
        urls.extend(self.video_hd_urls.iter().cloned());
        urls.extend(self.video_sd_urls.iter().cloned());
        if let Some(ref pic) = self.page_profile_picture_url {
            urls.push(pic.clone());
        }
        urls
    }

    /// Rewrite media fields through the mirror's URL mapping. URLs without
    /// a mapping entry keep their original value (mirror is best-effort).
    pub fn apply_url_mapping(&mut self, mapping: &HashMap<String, String>) {
        let remap = |urls: &mut Vec<String>| {
            for url in urls.iter_mut() {
                if let Some(mirrored) = mapping.get(url) {
                    *url = mirrored.clone();
                }
            }
        };
        remap(&mut self.resized_image_urls);
        remap(&mut self.original_image_urls);
        remap(&mut self.video_hd_urls);
        remap(&mut self.video_sd_urls);
        remap(&mut self.image_urls);
        if let Some(ref mut pic) = self.page_profile_picture_url {
            if let Some(mirrored) = mapping.get(pic) {
                *pic = mirrored.clone();
            }
        }
    }
}
