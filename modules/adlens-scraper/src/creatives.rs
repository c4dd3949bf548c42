use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use adlens_common::{AdCreative, AdType};

use crate::traits::CreativeStore;

/// Postgres persistence sink for normalized creatives, plus the competitor
/// profile lookup used by the transformer.
pub struct PgCreativeStore {
    pool: PgPool,
}

impl PgCreativeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_competitor(&self, rec: &AdCreative) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO competitor_ad_creatives (
                ad_archive_id, organisation_id, run_id, competitor_id,
                page_id, page_name, page_profile_picture_url,
                title, body, link_url, caption, cta_text, display_format,
                resized_image_urls, original_image_urls, video_hd_urls, video_sd_urls,
                image_urls, publisher_platforms, start_date, end_date, raw_data,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, NOW(), NOW())
            ON CONFLICT (ad_archive_id, organisation_id) DO UPDATE SET
                run_id = EXCLUDED.run_id,
                competitor_id = EXCLUDED.competitor_id,
                page_id = EXCLUDED.page_id,
                page_name = EXCLUDED.page_name,
                page_profile_picture_url = EXCLUDED.page_profile_picture_url,
                title = EXCLUDED.title,
                body = EXCLUDED.body,
                link_url = EXCLUDED.link_url,
                caption = EXCLUDED.caption,
                cta_text = EXCLUDED.cta_text,
                display_format = EXCLUDED.display_format,
                resized_image_urls = EXCLUDED.resized_image_urls,
                original_image_urls = EXCLUDED.original_image_urls,
                video_hd_urls = EXCLUDED.video_hd_urls,
                video_sd_urls = EXCLUDED.video_sd_urls,
                image_urls = EXCLUDED.image_urls,
                publisher_platforms = EXCLUDED.publisher_platforms,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                raw_data = EXCLUDED.raw_data,
                updated_at = NOW()
            "#,
        )
        .bind(&rec.ad_archive_id)
        .bind(rec.organisation_id)
        .bind(&rec.run_id)
        .bind(rec.competitor_id)
        .bind(&rec.page_id)
        .bind(&rec.page_name)
        .bind(&rec.page_profile_picture_url)
        .bind(&rec.title)
        .bind(&rec.body)
        .bind(&rec.link_url)
        .bind(&rec.caption)
        .bind(&rec.cta_text)
        .bind(&rec.display_format)
        .bind(&rec.resized_image_urls)
        .bind(&rec.original_image_urls)
        .bind(&rec.video_hd_urls)
        .bind(&rec.video_sd_urls)
        .bind(&rec.image_urls)
        .bind(&rec.publisher_platforms)
        .bind(rec.start_date)
        .bind(rec.end_date)
        .bind(&rec.raw_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_self(&self, rec: &AdCreative) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO self_ad_creatives (
                ad_archive_id, organisation_id, run_id,
                page_id, page_name, page_profile_picture_url,
                title, body, link_url, caption, cta_text, display_format,
                resized_image_urls, original_image_urls, video_hd_urls, video_sd_urls,
                image_urls, publisher_platforms, start_date, end_date, raw_data,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, NOW(), NOW())
            ON CONFLICT (ad_archive_id, organisation_id) DO UPDATE SET
                run_id = EXCLUDED.run_id,
                page_id = EXCLUDED.page_id,
                page_name = EXCLUDED.page_name,
                page_profile_picture_url = EXCLUDED.page_profile_picture_url,
                title = EXCLUDED.title,
                body = EXCLUDED.body,
                link_url = EXCLUDED.link_url,
                caption = EXCLUDED.caption,
                cta_text = EXCLUDED.cta_text,
                display_format = EXCLUDED.display_format,
                resized_image_urls = EXCLUDED.resized_image_urls,
                original_image_urls = EXCLUDED.original_image_urls,
                video_hd_urls = EXCLUDED.video_hd_urls,
                video_sd_urls = EXCLUDED.video_sd_urls,
                image_urls = EXCLUDED.image_urls,
                publisher_platforms = EXCLUDED.publisher_platforms,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                raw_data = EXCLUDED.raw_data,
                updated_at = NOW()
            "#,
        )
        .bind(&rec.ad_archive_id)
        .bind(rec.organisation_id)
        .bind(&rec.run_id)
        .bind(&rec.page_id)
        .bind(&rec.page_name)
        .bind(&rec.page_profile_picture_url)
        .bind(&rec.title)
        .bind(&rec.body)
        .bind(&rec.link_url)
        .bind(&rec.caption)
        .bind(&rec.cta_text)
        .bind(&rec.display_format)
        .bind(&rec.resized_image_urls)
        .bind(&rec.original_image_urls)
        .bind(&rec.video_hd_urls)
        .bind(&rec.video_sd_urls)
        .bind(&rec.image_urls)
        .bind(&rec.publisher_platforms)
        .bind(rec.start_date)
        .bind(rec.end_date)
        .bind(&rec.raw_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CreativeStore for PgCreativeStore {
    async fn bulk_upsert(&self, records: &[AdCreative], ad_type: AdType) -> Result<usize> {
        let mut written = 0usize;
        for rec in records {
            match ad_type {
                AdType::Competitor => self.upsert_competitor(rec).await?,
                AdType::SelfOwned => self.upsert_self(rec).await?,
            }
            written += 1;
        }
        Ok(written)
    }

    async fn competitor_id_for_url(
        &self,
        organisation_id: Uuid,
        url: &str,
    ) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM competitor_profiles WHERE organisation_id = $1 AND url = $2",
        )
        .bind(organisation_id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.try_get("id")).transpose()?)
    }
}
