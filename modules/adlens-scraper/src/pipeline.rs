use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use uuid::Uuid;

use adlens_common::AdType;

use crate::classify::classify;
use crate::mirror::MediaMirror;
use crate::traits::{CreativeStore, RunStore, ScrapedAd};
use crate::transform::transform_all;

/// Everything the processing stages need to know about one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub organisation_id: Uuid,
    pub target_url: String,
    pub ad_type: AdType,
}

/// Counters reported on a run's terminal transition.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub persisted: usize,
    pub skipped: usize,
    pub mirrored: usize,
    pub mirror_failed: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "persisted={} skipped={} mirrored={} mirror_failed={}",
            self.persisted, self.skipped, self.mirrored, self.mirror_failed
        )
    }
}

/// The processing stages behind a successful poll: classify → fast persist
/// (original URLs) → mirror (best-effort) → durable persist (mirrored URLs)
/// → completion marker. Runs exactly once per run.
pub struct ResultPipeline {
    creatives: Arc<dyn CreativeStore>,
    runs: Arc<dyn RunStore>,
    mirror: MediaMirror,
}

impl ResultPipeline {
    pub fn new(
        creatives: Arc<dyn CreativeStore>,
        runs: Arc<dyn RunStore>,
        mirror: MediaMirror,
    ) -> Self {
        Self {
            creatives,
            runs,
            mirror,
        }
    }

    pub async fn process(&self, ctx: &RunContext, items: Vec<ScrapedAd>) -> Result<RunSummary> {
        let received = items.len();
        let classified = classify(items);
        info!(
            run_id = %ctx.run_id,
            received,
            kept = classified.kept.len(),
            skipped_no_id = classified.skipped_no_id,
            skipped_no_media = classified.skipped_no_media,
            "Classified provider results"
        );

        // Nothing usable: the run still completes, without touching the
        // sink or the mirror.
        if classified.kept.is_empty() {
            self.runs
                .mark_complete(&ctx.run_id)
                .await
                .context("completion marker failed")?;
            info!(run_id = %ctx.run_id, "No usable creatives; run completed empty");
            return Ok(RunSummary {
                skipped: classified.skipped(),
                ..RunSummary::default()
            });
        }

        let competitor_id = self.resolve_competitor(ctx).await;
        let (mut records, transform_failed) =
            transform_all(&classified.kept, ctx, competitor_id)?;

        // Fast pass: provider-original URLs, queryable immediately.
        let persisted = self
            .creatives
            .bulk_upsert(&records, ctx.ad_type)
            .await
            .context("fast persistence pass failed")?;
        info!(run_id = %ctx.run_id, persisted, "Fast persistence pass applied");

        let mut urls: Vec<String> = Vec::new();
        for record in &records {
            urls.extend(record.media_urls());
        }
        let outcome = self
            .mirror
            .mirror(&urls, ctx.organisation_id, ctx.ad_type)
            .await;

        // Durable pass: only worth a second write when something mirrored.
        if !outcome.url_mapping.is_empty() {
            for record in &mut records {
                record.apply_url_mapping(&outcome.url_mapping);
            }
            self.creatives
                .bulk_upsert(&records, ctx.ad_type)
                .await
                .context("durable persistence pass failed")?;
            info!(run_id = %ctx.run_id, mapped = outcome.url_mapping.len(), "Durable persistence pass applied");
        }

        self.runs
            .mark_complete(&ctx.run_id)
            .await
            .context("completion marker failed")?;

        Ok(RunSummary {
            persisted,
            skipped: classified.skipped() + transform_failed,
            mirrored: outcome.successful.len(),
            mirror_failed: outcome.failed.len(),
        })
    }

    /// Competitor profile lookup for the run's target URL. A miss, or a
    /// lookup error, yields `None` rather than failing the run.
    async fn resolve_competitor(&self, ctx: &RunContext) -> Option<Uuid> {
        if ctx.ad_type != AdType::Competitor {
            return None;
        }
        match self
            .creatives
            .competitor_id_for_url(ctx.organisation_id, &ctx.target_url)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(run_id = %ctx.run_id, error = %e, "Competitor lookup failed; storing without competitor_id");
                None
            }
        }
    }
}
