use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use adlens_common::{AdType, AdlensError, ScrapeRun};

use crate::pipeline::RunContext;
use crate::scheduler::PollScheduler;
use crate::traits::{RunStore, ScrapeProvider};

/// Entry point for new scrape runs. Submission order matters: the provider
/// is asked first, so a rejected submission surfaces to the caller before
/// any run record exists.
pub struct SubmissionGate {
    provider: Arc<dyn ScrapeProvider>,
    runs: Arc<dyn RunStore>,
    scheduler: Arc<PollScheduler>,
}

impl SubmissionGate {
    pub fn new(
        provider: Arc<dyn ScrapeProvider>,
        runs: Arc<dyn RunStore>,
        scheduler: Arc<PollScheduler>,
    ) -> Self {
        Self {
            provider,
            runs,
            scheduler,
        }
    }

    /// Submit a scrape for a target, register the run, and detach a poller.
    /// Returns the provider-issued run id immediately.
    pub async fn start_run(
        &self,
        target: &str,
        organisation_id: Uuid,
        ad_type: AdType,
    ) -> Result<String, AdlensError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(AdlensError::Validation("target URL must not be empty".into()));
        }
        let parsed = url::Url::parse(target)
            .map_err(|_| AdlensError::Validation(format!("invalid target URL: {target}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AdlensError::Validation(format!(
                "target URL must be http(s), got {}",
                parsed.scheme()
            )));
        }

        // Activity is judged on the most recently created run only. Product
        // policy is "always start fresh, overwrite", so an active run is
        // logged, not blocking.
        match self.runs.latest_run(organisation_id).await {
            Ok(Some(run)) if run.is_active() => {
                warn!(
                    organisation_id = %organisation_id,
                    previous_run_id = %run.run_id,
                    "Organisation already has an active run; starting fresh anyway"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(organisation_id = %organisation_id, error = %e, "Active-run check failed; proceeding");
            }
        }

        let run_id = self
            .provider
            .submit(target)
            .await
            .map_err(|e| AdlensError::Provider(e.to_string()))?;

        let run = ScrapeRun::new(run_id.clone(), organisation_id, target);
        self.runs
            .create_run(&run)
            .await
            .map_err(|e| AdlensError::Database(e.to_string()))?;

        let started = self.scheduler.start_polling(RunContext {
            run_id: run_id.clone(),
            organisation_id,
            target_url: target.to_string(),
            ad_type,
        });
        if started {
            info!(run_id = %run_id, organisation_id = %organisation_id, target, "Scrape run started; polling detached");
        }

        Ok(run_id)
    }
}
