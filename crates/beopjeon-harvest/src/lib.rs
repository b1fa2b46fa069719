//! Retry/concurrency controller: runs fetch → parse → extract for a batch of
//! work items with bounded parallelism, rate limiting and retries.

pub mod cancel;
pub mod config;
pub mod harvester;
pub mod limiter;
pub mod outcome;
pub mod report;

pub use cancel::CancellationToken;
pub use config::HarvestConfig;
pub use harvester::Harvester;
pub use limiter::RateLimiter;
pub use outcome::{ItemError, Outcome, SkipReason, WorkItem};
pub use report::{HarvestError, HarvestReport, RunSummary};
