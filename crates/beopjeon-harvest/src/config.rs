//! Harvest tuning: worker pool, retry ceiling, backoff and rate limit.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::report::HarvestError;

/// The `[harvest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Concurrent fetch-parse-extract pipelines.
    pub workers: usize,
    /// Attempts per item, including the first.
    pub max_attempts: u32,
    /// Timeout for a single fetch attempt.
    pub attempt_timeout_ms: u64,
    /// Delay before the first retry; doubles on each further retry.
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Global outbound request rate. `0` disables limiting.
    pub requests_per_second: f64,
    /// Requests allowed back-to-back before the rate applies.
    pub burst: u32,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 5,
            attempt_timeout_ms: 15_000,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            requests_per_second: 2.0,
            burst: 1,
        }
    }
}

impl HarvestConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based):
    /// `base · 2^(attempt-1)`, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self.base_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Backoff, stretched to honour a remote `Retry-After` up to the cap.
    pub fn retry_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(self.max_backoff_ms);
        let backoff = self.backoff(attempt);
        match retry_after {
            Some(requested) => backoff.max(requested.min(cap)),
            None => backoff,
        }
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.workers == 0 {
            return Err(HarvestError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(HarvestError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(HarvestError::InvalidConfig("attempt_timeout_ms must be positive".into()));
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second < 0.0 {
            return Err(HarvestError::InvalidConfig(
                "requests_per_second must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.attempt_timeout(), Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.backoff(1), Duration::from_millis(500));
        assert_eq!(cfg.backoff(2), Duration::from_millis(1000));
        assert_eq!(cfg.backoff(3), Duration::from_millis(2000));
        assert_eq!(cfg.backoff(7), Duration::from_millis(30_000));
        assert_eq!(cfg.backoff(200), Duration::from_millis(30_000));
    }

    #[test]
    fn retry_after_stretches_but_respects_cap() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.retry_delay(1, Some(Duration::from_secs(3))), Duration::from_secs(3));
        assert_eq!(cfg.retry_delay(1, Some(Duration::from_secs(3600))), Duration::from_secs(30));
        assert_eq!(cfg.retry_delay(2, Some(Duration::from_millis(10))), Duration::from_secs(1));
    }

    #[test]
    fn invalid_values_rejected() {
        let cfg = HarvestConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = HarvestConfig {
            requests_per_second: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_table_fills_defaults() {
        let cfg: HarvestConfig = serde_json::from_str(r#"{"workers": 8}"#).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.max_attempts, 5);
    }
}
