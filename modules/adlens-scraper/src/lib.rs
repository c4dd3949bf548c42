pub mod classify;
pub mod creatives;
pub mod gate;
pub mod mirror;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod scheduler;
pub mod traits;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;


pub use gate::SubmissionGate;
pub use pipeline::{ResultPipeline, RunContext};
pub use scheduler::{PollConfig, PollScheduler, RunStatus};
