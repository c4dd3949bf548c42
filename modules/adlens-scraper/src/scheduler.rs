use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::pipeline::{ResultPipeline, RunContext};
use crate::traits::{FetchOutcome, ScrapeProvider};

/// Bounded fixed-delay retry budget for one run. The provider's job latency
/// is not bursty, so there is no exponential backoff between attempts.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 25,
            delay: Duration::from_secs(10),
        }
    }
}

/// Why a poll loop ended.
enum PollEnd {
    Processed,
    TimedOut,
    Cancelled,
}

struct RunHandle {
    cancel: Arc<AtomicBool>,
}

/// Operational snapshot of in-flight polling.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub active_count: usize,
    pub active_run_ids: Vec<String>,
}

/// Owns every in-flight poll loop. One loop per `run_id` process-wide:
/// insertion into the handle map is the dedup gate, removal happens on
/// every terminal transition (success, processing abort, timeout,
/// cancellation). Process-local only: a restart drops in-flight tracking
/// with no resumption.
pub struct PollScheduler {
    provider: Arc<dyn ScrapeProvider>,
    pipeline: Arc<ResultPipeline>,
    config: PollConfig,
    active: Mutex<HashMap<String, RunHandle>>,
}

impl PollScheduler {
    pub fn new(
        provider: Arc<dyn ScrapeProvider>,
        pipeline: Arc<ResultPipeline>,
        config: PollConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            pipeline,
            config,
            active: Mutex::new(HashMap::new()),
        })
    }

    /// Start a detached poll loop for a run. Returns false (and starts
    /// nothing) if a loop for this `run_id` is already active.
    pub fn start_polling(self: &Arc<Self>, ctx: RunContext) -> bool {
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.lock().expect("poll registry poisoned");
            if active.contains_key(&ctx.run_id) {
                warn!(run_id = %ctx.run_id, "Poll loop already active for this run; not starting another");
                return false;
            }
            active.insert(
                ctx.run_id.clone(),
                RunHandle {
                    cancel: cancel.clone(),
                },
            );
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let end = scheduler.poll_loop(&ctx, &cancel).await;
            match end {
                PollEnd::Processed => {}
                PollEnd::TimedOut => warn!(
                    run_id = %ctx.run_id,
                    max_attempts = scheduler.config.max_attempts,
                    "Poll attempts exhausted; run abandoned as timed out"
                ),
                PollEnd::Cancelled => info!(run_id = %ctx.run_id, "Poll loop cancelled"),
            }
            scheduler.remove(&ctx.run_id);
        });
        true
    }

    async fn poll_loop(&self, ctx: &RunContext, cancel: &AtomicBool) -> PollEnd {
        for attempt in 1..=self.config.max_attempts {
            if cancel.load(Ordering::Relaxed) {
                return PollEnd::Cancelled;
            }

            match self.provider.fetch_results(&ctx.run_id).await {
                Ok(FetchOutcome::Items(items)) => {
                    info!(
                        run_id = %ctx.run_id,
                        attempt,
                        count = items.len(),
                        "Provider results ready; processing"
                    );
                    // The pipeline runs exactly once per run. An error here
                    // is terminal: the run stays incomplete, no retry.
                    match self.pipeline.process(ctx, items).await {
                        Ok(summary) => {
                            info!(run_id = %ctx.run_id, %summary, "Run completed")
                        }
                        Err(e) => {
                            error!(run_id = %ctx.run_id, error = %e, "Run processing aborted")
                        }
                    }
                    return PollEnd::Processed;
                }
                Ok(FetchOutcome::Pending) => {
                    debug!(run_id = %ctx.run_id, attempt, "No results yet");
                }
                Err(e) => {
                    // Transient fetch errors are swallowed and count
                    // against the attempt budget.
                    warn!(run_id = %ctx.run_id, attempt, error = %e, "Result fetch failed");
                }
            }

            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.delay).await;
            }
        }
        PollEnd::TimedOut
    }

    fn remove(&self, run_id: &str) {
        self.active
            .lock()
            .expect("poll registry poisoned")
            .remove(run_id);
    }

    /// Snapshot for the monitoring endpoint.
    pub fn status(&self) -> RunStatus {
        let active = self.active.lock().expect("poll registry poisoned");
        let mut active_run_ids: Vec<String> = active.keys().cloned().collect();
        active_run_ids.sort();
        RunStatus {
            active_count: active_run_ids.len(),
            active_run_ids,
        }
    }

    /// Flip every in-flight loop's cancel flag. Loops notice at their next
    /// attempt boundary.
    pub fn shutdown(&self) {
        let active = self.active.lock().expect("poll registry poisoned");
        for handle in active.values() {
            handle.cancel.store(true, Ordering::Relaxed);
        }
        info!(count = active.len(), "Cancellation requested for in-flight poll loops");
    }
}
