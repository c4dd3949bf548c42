use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Actor run metadata, returned at submission and on every status read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunData {
    pub id: String,
    pub status: String,
    pub default_dataset_id: String,
}

impl RunData {
    pub fn succeeded(&self) -> bool {
        self.status == "SUCCEEDED"
    }

    /// Terminal provider-side failure (distinct from "still running").
    pub fn failed(&self) -> bool {
        matches!(self.status.as_str(), "FAILED" | "ABORTED" | "TIMED-OUT")
    }
}

/// Input for the ad-library scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct AdLibraryInput {
    pub urls: Vec<StartUrl>,
    #[serde(rename = "scrapeAdDetails")]
    pub scrape_ad_details: bool,
    pub count: u32,
}

/// A start URL entry for scraper input.
#[derive(Debug, Clone, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// One raw ad record from the scraper dataset. The actor's output schema
/// drifts; everything is optional and unknown fields are retained so the
/// verbatim snapshot can be persisted for audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAdItem {
    pub ad_archive_id: Option<String>,
    pub ad_id: Option<String>,
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub page_profile_picture_url: Option<String>,
    pub title: Option<String>,
    pub body: Option<BodyText>,
    pub link_url: Option<String>,
    pub caption: Option<String>,
    pub cta_text: Option<String>,
    pub display_format: Option<String>,
    #[serde(alias = "publisher_platform")]
    pub publisher_platforms: Vec<String>,
    /// Epoch seconds.
    pub start_date: Option<i64>,
    /// Epoch seconds.
    pub end_date: Option<i64>,
    pub snapshot: AdSnapshot,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl RawAdItem {
    /// Stable identifier for storage; falls back to the provider-internal
    /// ad id when the archive id is missing.
    pub fn archive_id(&self) -> Option<&str> {
        self.ad_archive_id.as_deref().or(self.ad_id.as_deref())
    }

    /// Resolve the media payload into the normalized four-list structure.
    pub fn media_sets(&self) -> MediaSets {
        self.snapshot.media_payload().resolve()
    }

    // Textual fields fall back to the nested snapshot when the top-level
    // field is absent.

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref().or(self.snapshot.title.as_deref())
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(BodyText::text)
            .or_else(|| self.snapshot.body.as_ref().and_then(BodyText::text))
    }

    pub fn link_url_text(&self) -> Option<&str> {
        self.link_url.as_deref().or(self.snapshot.link_url.as_deref())
    }

    pub fn caption_text(&self) -> Option<&str> {
        self.caption.as_deref().or(self.snapshot.caption.as_deref())
    }

    pub fn cta_text_text(&self) -> Option<&str> {
        self.cta_text.as_deref().or(self.snapshot.cta_text.as_deref())
    }

    pub fn display_format_text(&self) -> Option<&str> {
        self.display_format
            .as_deref()
            .or(self.snapshot.display_format.as_deref())
    }

    pub fn page_id_text(&self) -> Option<&str> {
        self.page_id.as_deref().or(self.snapshot.page_id.as_deref())
    }

    pub fn page_name_text(&self) -> Option<&str> {
        self.page_name.as_deref().or(self.snapshot.page_name.as_deref())
    }

    pub fn profile_picture_url(&self) -> Option<&str> {
        self.page_profile_picture_url
            .as_deref()
            .or(self.snapshot.page_profile_picture_url.as_deref())
    }
}

/// The provider's semi-structured creative snapshot, nested inside each ad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdSnapshot {
    pub title: Option<String>,
    pub body: Option<BodyText>,
    pub link_url: Option<String>,
    pub caption: Option<String>,
    pub cta_text: Option<String>,
    pub display_format: Option<String>,
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub page_profile_picture_url: Option<String>,
    /// Carousel-style media: one card per asset. When present it takes
    /// precedence over the fallback arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<AdCard>>,
    /// Fallback media arrays of mixed string/object entries.
    pub images: Vec<ImageEntry>,
    pub videos: Vec<VideoEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AdSnapshot {
    pub fn media_payload(&self) -> MediaPayload<'_> {
        match &self.cards {
            Some(cards) => MediaPayload::Cards { cards },
            None => MediaPayload::Assets {
                images: &self.images,
                videos: &self.videos,
            },
        }
    }
}

/// Body text arrives either as a plain string or as `{ "text": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyText {
    Structured { text: Option<String> },
    Plain(String),
}

impl BodyText {
    pub fn text(&self) -> Option<&str> {
        match self {
            BodyText::Structured { text } => text.as_deref(),
            BodyText::Plain(s) => Some(s.as_str()),
        }
    }
}

/// The two media shapes the provider is known to emit. Resolved exactly once
/// at this boundary into `MediaSets`; downstream code never probes the raw
/// shape again.
#[derive(Debug)]
pub enum MediaPayload<'a> {
    /// Carousel-style: one card per asset, each carrying up to four URL
    /// fields.
    Cards { cards: &'a [AdCard] },
    /// Fallback: separate image/video arrays of mixed string/object entries.
    Assets {
        images: &'a [ImageEntry],
        videos: &'a [VideoEntry],
    },
}

impl MediaPayload<'_> {
    /// Flatten either shape into the normalized four-list structure.
    /// Empty and non-string entries are dropped silently.
    pub fn resolve(self) -> MediaSets {
        let mut sets = MediaSets::default();
        match self {
            MediaPayload::Cards { cards } => {
                for card in cards {
                    push_if_set(&mut sets.resized_image_urls, &card.resized_image_url);
                    push_if_set(&mut sets.original_image_urls, &card.original_image_url);
                    push_if_set(&mut sets.video_hd_urls, &card.video_hd_url);
                    push_if_set(&mut sets.video_sd_urls, &card.video_sd_url);
                }
            }
            MediaPayload::Assets { images, videos } => {
                for image in images {
                    match image {
                        ImageEntry::Url(url) if !url.is_empty() => {
                            sets.original_image_urls.push(url.clone());
                        }
                        ImageEntry::Url(_) => {}
                        ImageEntry::Object {
                            original_image_url,
                            resized_image_url,
                        } => {
                            push_if_set(&mut sets.original_image_urls, original_image_url);
                            push_if_set(&mut sets.resized_image_urls, resized_image_url);
                        }
                        ImageEntry::Other(_) => {}
                    }
                }
                for video in videos {
                    match video {
                        // Bare video URLs carry no quality hint; treated as SD.
                        VideoEntry::Url(url) if !url.is_empty() => {
                            sets.video_sd_urls.push(url.clone());
                        }
                        VideoEntry::Url(_) => {}
                        VideoEntry::Object {
                            video_hd_url,
                            video_sd_url,
                        } => {
                            push_if_set(&mut sets.video_hd_urls, video_hd_url);
                            push_if_set(&mut sets.video_sd_urls, video_sd_url);
                        }
                        VideoEntry::Other(_) => {}
                    }
                }
            }
        }
        sets
    }
}

fn push_if_set(list: &mut Vec<String>, url: &Option<String>) {
    if let Some(url) = url {
        if !url.is_empty() {
            list.push(url.clone());
        }
    }
}

/// One carousel card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdCard {
    pub title: Option<String>,
    pub body: Option<String>,
    pub link_url: Option<String>,
    pub resized_image_url: Option<String>,
    pub original_image_url: Option<String>,
    pub video_hd_url: Option<String>,
    pub video_sd_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// An entry in the fallback `images[]` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageEntry {
    Url(String),
    Object {
        original_image_url: Option<String>,
        resized_image_url: Option<String>,
    },
    Other(Value),
}

/// An entry in the fallback `videos[]` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoEntry {
    Url(String),
    Object {
        video_hd_url: Option<String>,
        video_sd_url: Option<String>,
    },
    Other(Value),
}

/// Normalized media references for one creative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaSets {
    pub resized_image_urls: Vec<String>,
    pub original_image_urls: Vec<String>,
    pub video_hd_urls: Vec<String>,
    pub video_sd_urls: Vec<String>,
}

impl MediaSets {
    /// A creative with no visual or video asset is not useful downstream.
    pub fn is_empty(&self) -> bool {
        self.resized_image_urls.is_empty()
            && self.original_image_urls.is_empty()
            && self.video_hd_urls.is_empty()
            && self.video_sd_urls.is_empty()
    }
}
