use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use adlens_common::ScrapeRun;

use crate::traits::RunStore;

/// `runner_scrapers`-backed run registry. One row per scrape attempt;
/// rows are never deleted.
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run the embedded SQL migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn row_to_run(row: &sqlx::postgres::PgRow) -> Result<ScrapeRun> {
    Ok(ScrapeRun {
        run_id: row.try_get("run_id")?,
        organisation_id: row.try_get("organisation_id")?,
        target_url: row.try_get("target_url")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
        ads_scraped: row.try_get("ads_scraped")?,
    })
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create_run(&self, run: &ScrapeRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runner_scrapers (run_id, organisation_id, target_url, created_at, completed_at, ads_scraped)
            VALUES ($1, $2, $3, $4, NULL, FALSE)
            ON CONFLICT (run_id) DO UPDATE
            SET organisation_id = EXCLUDED.organisation_id,
                target_url = EXCLUDED.target_url,
                created_at = EXCLUDED.created_at,
                completed_at = NULL,
                ads_scraped = FALSE
            "#,
        )
        .bind(&run.run_id)
        .bind(run.organisation_id)
        .bind(&run.target_url)
        .bind(run.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_run(&self, organisation_id: Uuid) -> Result<Option<ScrapeRun>> {
        let row = sqlx::query(
            r#"
            SELECT run_id, organisation_id, target_url, created_at, completed_at, ads_scraped
            FROM runner_scrapers
            WHERE organisation_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(organisation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_run).transpose()
    }

    async fn mark_complete(&self, run_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE runner_scrapers
            SET completed_at = NOW(), ads_scraped = TRUE
            WHERE run_id = $1
            "#,
        )
        .bind(run_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_incomplete(&self) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM runner_scrapers WHERE ads_scraped = FALSE AND completed_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("n")?)
    }
}
