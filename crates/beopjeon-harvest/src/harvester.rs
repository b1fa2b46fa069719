//! Retry/concurrency controller.
//!
//! Each work item runs fetch → parse → extract on its own task. A semaphore
//! bounds the number of items in flight, a shared token bucket bounds the
//! outbound request rate, and transient fetch failures are retried with
//! capped exponential backoff. Results land in a slot per input index, so
//! the report preserves input order regardless of completion order.

use std::sync::Arc;

use beopjeon_core::{Extraction, RawPayload, SourceRef, StructureExtractor};
use beopjeon_format::ParseError;
use beopjeon_sync::{FetchError, SourceAdapter};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::config::HarvestConfig;
use crate::limiter::RateLimiter;
use crate::outcome::{ItemError, Outcome, SkipReason, WorkItem};
use crate::report::{HarvestError, HarvestReport};

struct Shared {
    adapter: Arc<dyn SourceAdapter>,
    extractor: Arc<StructureExtractor>,
    config: HarvestConfig,
    limiter: RateLimiter,
    cancel: CancellationToken,
}

pub struct Harvester {
    shared: Arc<Shared>,
}

impl Harvester {
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        extractor: Arc<StructureExtractor>,
        config: HarvestConfig,
    ) -> Result<Self, HarvestError> {
        Self::with_cancellation(adapter, extractor, config, CancellationToken::new())
    }

    pub fn with_cancellation(
        adapter: Arc<dyn SourceAdapter>,
        extractor: Arc<StructureExtractor>,
        config: HarvestConfig,
        cancel: CancellationToken,
    ) -> Result<Self, HarvestError> {
        config.validate()?;
        let limiter = RateLimiter::new(config.requests_per_second, config.burst);
        Ok(Self {
            shared: Arc::new(Shared {
                adapter,
                extractor,
                config,
                limiter,
                cancel,
            }),
        })
    }

    /// Token that stops this harvester from starting new attempts.
    pub fn cancellation(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Harvest every item. Never fails as a whole: each item ends in exactly
    /// one outcome. Use [`HarvestReport::ensure_success`] to treat an
    /// all-failed run as fatal.
    pub async fn run(&self, items: Vec<WorkItem>) -> HarvestReport {
        let started_at = Utc::now();
        let total = items.len();
        let workers = self.shared.config.workers;
        info!(items = total, workers, "harvest started");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut slots: Vec<Option<Outcome>> = vec![None; total];
        let mut targets = Vec::with_capacity(total);
        let mut set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            targets.push(item.target.clone());
            let permit = if self.shared.cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = self.shared.cancel.cancelled() => None,
                    permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
                }
            };
            let Some(permit) = permit else {
                slots[index] = Some(cancelled(item.target));
                continue;
            };

            let shared = Arc::clone(&self.shared);
            set.spawn(async move {
                let outcome = process(&shared, item).await;
                drop(permit);
                (index, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = %e, "harvest worker aborted"),
            }
        }

        let outcomes: Vec<Outcome> = slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| Outcome::Failed {
                    target,
                    error: ItemError::Aborted("worker task ended without reporting".into()),
                    attempts: 0,
                })
            })
            .collect();

        let report = HarvestReport {
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        let summary = report.summary();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            retries = summary.retries,
            "harvest finished"
        );
        report
    }
}

fn cancelled(target: SourceRef) -> Outcome {
    Outcome::Skipped {
        target,
        reason: SkipReason::Cancelled,
    }
}

async fn process(shared: &Shared, item: WorkItem) -> Outcome {
    let (mut payload, attempts) = match fetch_with_retry(shared, &item.target).await {
        Ok(fetched) => fetched,
        Err(outcome) => return outcome,
    };
    if let Some(format) = item.format {
        payload.format = Some(format);
    }
    let source = payload.source.clone();

    let extractor = Arc::clone(&shared.extractor);
    let extracted = tokio::task::spawn_blocking(move || -> Result<Extraction, ParseError> {
        let parsed = beopjeon_format::parse(&payload)?;
        Ok(extractor.extract(&parsed))
    })
    .await;

    match extracted {
        Ok(Ok(Extraction::Document(mut document))) => {
            if let Some(code) = item.statute_code {
                document.statute_code = code;
            }
            if document.sources.is_empty() {
                document.sources.push(source.source_id.clone());
            }
            info!(
                source = %source,
                statute_code = %document.statute_code,
                articles = document.article_count(),
                warnings = document.warnings.len(),
                attempts,
                "statute extracted"
            );
            Outcome::Success {
                source,
                document,
                attempts,
            }
        }
        Ok(Ok(Extraction::NoStatute(warning))) => {
            warn!(source = %source, %warning, "payload skipped");
            Outcome::Skipped {
                target: item.target,
                reason: SkipReason::NotAStatute(warning),
            }
        }
        Ok(Err(e)) => {
            warn!(source = %source, error = %e, "payload could not be parsed");
            Outcome::Failed {
                target: item.target,
                error: e.into(),
                attempts,
            }
        }
        Err(e) => {
            error!(source = %source, error = %e, "parser task aborted");
            Outcome::Failed {
                target: item.target,
                error: ItemError::Aborted(e.to_string()),
                attempts,
            }
        }
    }
}

/// Fetch `target`, retrying transient failures. On give-up the terminal
/// outcome is returned as the error.
async fn fetch_with_retry(shared: &Shared, target: &SourceRef) -> Result<(RawPayload, u32), Outcome> {
    let config = &shared.config;
    let mut attempts = 0;
    let mut last_error: Option<FetchError> = None;

    loop {
        if !admit(shared).await {
            return Err(match last_error {
                None => cancelled(target.clone()),
                Some(e) => failed(target, e, attempts),
            });
        }

        attempts += 1;
        let result = match tokio::time::timeout(config.attempt_timeout(), shared.adapter.fetch(target)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(format!(
                "{target} after {}ms",
                config.attempt_timeout_ms
            ))),
        };

        match result {
            Ok(payload) => {
                debug!(source = %target, attempts, bytes = payload.size(), "fetched");
                return Ok((payload, attempts));
            }
            Err(e) if e.is_transient() && attempts < config.max_attempts => {
                let delay = config.retry_delay(attempts, e.retry_after());
                warn!(
                    source = %target,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient fetch failure, retrying"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.cancel.cancelled() => {}
                }
                last_error = Some(e);
            }
            Err(e) => return Err(failed(target, e, attempts)),
        }
    }
}

/// Wait for a rate-limit token. `false` if cancellation came first, in which
/// case no request may be sent.
async fn admit(shared: &Shared) -> bool {
    if shared.cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => return false,
        _ = shared.limiter.acquire() => {}
    }
    !shared.cancel.is_cancelled()
}

fn failed(target: &SourceRef, error: FetchError, attempts: u32) -> Outcome {
    warn!(source = %target, attempts, kind = error.kind(), error = %error, "fetch failed");
    Outcome::Failed {
        target: target.clone(),
        error: ItemError::Fetch(error),
        attempts,
    }
}
