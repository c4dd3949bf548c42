use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use adlens_common::{AdCreative, AdType};

use crate::pipeline::RunContext;
use crate::traits::ScrapedAd;

/// Map one validated raw record into a normalized creative.
pub fn transform(
    record: &ScrapedAd,
    ctx: &RunContext,
    competitor_id: Option<Uuid>,
) -> Result<AdCreative> {
    let item = &record.item;
    let ad_archive_id = item
        .archive_id()
        .context("record has no archive identifier")?
        .to_string();

    let media = item.media_sets();

    // Legacy consolidated image list: originals first, then resized, deduped.
    let mut image_urls: Vec<String> = Vec::new();
    for url in media.original_image_urls.iter().chain(media.resized_image_urls.iter()) {
        if !image_urls.contains(url) {
            image_urls.push(url.clone());
        }
    }

    Ok(AdCreative {
        ad_archive_id,
        run_id: ctx.run_id.clone(),
        organisation_id: ctx.organisation_id,
        competitor_id: match ctx.ad_type {
            AdType::Competitor => competitor_id,
            AdType::SelfOwned => None,
        },
        page_id: item.page_id_text().map(str::to_string),
        page_name: item.page_name_text().map(str::to_string),
        page_profile_picture_url: item.profile_picture_url().map(str::to_string),
        title: item.title_text().map(str::to_string),
        body: item.body_text().map(str::to_string),
        link_url: item.link_url_text().map(str::to_string),
        caption: item.caption_text().map(str::to_string),
        cta_text: item.cta_text_text().map(str::to_string),
        display_format: item.display_format_text().map(str::to_string),
        resized_image_urls: media.resized_image_urls,
        original_image_urls: media.original_image_urls,
        video_hd_urls: media.video_hd_urls,
        video_sd_urls: media.video_sd_urls,
        image_urls,
        publisher_platforms: item.publisher_platforms.clone(),
        start_date: epoch_to_datetime(item.start_date),
        end_date: epoch_to_datetime(item.end_date),
        // The provider's record exactly as it arrived, for audit.
        raw_data: record.raw.clone(),
    })
}

/// Transform a whole classified batch. Per-record failures are logged and
/// skipped; the batch only fails when nothing survives.
pub fn transform_all(
    records: &[ScrapedAd],
    ctx: &RunContext,
    competitor_id: Option<Uuid>,
) -> Result<(Vec<AdCreative>, usize)> {
    let mut out = Vec::with_capacity(records.len());
    let mut failed = 0usize;

    for record in records {
        match transform(record, ctx, competitor_id) {
            Ok(creative) => out.push(creative),
            Err(e) => {
                failed += 1;
                warn!(
                    run_id = %ctx.run_id,
                    ad_archive_id = record.item.archive_id().unwrap_or_default(),
                    error = %e,
                    "Skipping untransformable record"
                );
            }
        }
    }

    if out.is_empty() && !records.is_empty() {
        anyhow::bail!(
            "no transformable records in run {}: all {} failed",
            ctx.run_id,
            failed
        );
    }

    Ok((out, failed))
}

fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_item_with_image, run_context, scraped};

    #[test]
    fn maps_fields_and_converts_epochs() {
        let record = scraped(serde_json::json!({
            "ad_archive_id": "A1",
            "page_id": "p9",
            "start_date": 1700000000i64,
            "end_date": 1700086400i64,
            "publisher_platform": ["facebook"],
            "snapshot": {
                "title": "Nested title",
                "body": "plain body",
                "cta_text": "Shop Now",
                "cards": [{
                    "original_image_url": "https://cdn.example/o.jpg",
                    "resized_image_url": "https://cdn.example/r.jpg"
                }]
            }
        }));

        let ctx = run_context("r1", adlens_common::AdType::Competitor);
        let rec = transform(&record, &ctx, None).unwrap();

        assert_eq!(rec.ad_archive_id, "A1");
        assert_eq!(rec.run_id, "r1");
        assert_eq!(rec.title.as_deref(), Some("Nested title"));
        assert_eq!(rec.body.as_deref(), Some("plain body"));
        assert_eq!(rec.cta_text.as_deref(), Some("Shop Now"));
        assert_eq!(rec.start_date.unwrap().to_rfc3339(), "2023-11-14T22:13:20+00:00");
        assert_eq!(rec.end_date.unwrap().timestamp(), 1700086400);
        assert_eq!(rec.publisher_platforms, vec!["facebook"]);
        // Legacy consolidated list covers both image variants.
        assert_eq!(rec.image_urls.len(), 2);
    }

    #[test]
    fn raw_data_is_the_verbatim_provider_record() {
        let raw = serde_json::json!({
            "ad_archive_id": "A1",
            "publisher_platform": ["facebook"],
            "spend_estimate": { "lower": 100 },
            "snapshot": { "images": ["https://cdn.example/x.jpg"] }
        });

        let ctx = run_context("r1", adlens_common::AdType::SelfOwned);
        let rec = transform(&scraped(raw.clone()), &ctx, None).unwrap();

        // Stored exactly as received: the aliased key keeps its original
        // name and absent fields are not injected as nulls.
        assert_eq!(rec.raw_data, raw);
        assert!(rec.raw_data.get("publisher_platforms").is_none());
        assert!(rec.raw_data.get("title").is_none());
    }

    #[test]
    fn competitor_id_only_set_for_competitor_variant() {
        let record = raw_item_with_image("A2", "https://cdn.example/x.jpg");
        let competitor_id = Some(Uuid::new_v4());

        let ctx = run_context("r1", adlens_common::AdType::Competitor);
        let rec = transform(&record, &ctx, competitor_id).unwrap();
        assert_eq!(rec.competitor_id, competitor_id);

        let ctx = run_context("r1", adlens_common::AdType::SelfOwned);
        let rec = transform(&record, &ctx, competitor_id).unwrap();
        assert_eq!(rec.competitor_id, None);
    }

    #[test]
    fn lookup_miss_yields_none_not_error() {
        let record = raw_item_with_image("A3", "https://cdn.example/x.jpg");
        let ctx = run_context("r1", adlens_common::AdType::Competitor);
        let rec = transform(&record, &ctx, None).unwrap();
        assert_eq!(rec.competitor_id, None);
    }

    #[test]
    fn batch_fails_only_when_nothing_survives() {
        let bad = scraped(serde_json::json!({
            "snapshot": { "images": ["https://cdn.example/a.jpg"] }
        }));
        let good = raw_item_with_image("A4", "https://cdn.example/b.jpg");
        let ctx = run_context("r1", adlens_common::AdType::SelfOwned);

        // One bad record among good ones is skipped and counted.
        let (records, failed) = transform_all(&[bad.clone(), good], &ctx, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(failed, 1);

        // All-bad batch is a run-level error.
        assert!(transform_all(&[bad], &ctx, None).is_err());
    }
}
