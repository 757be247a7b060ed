//! Time budget management for a single search.
//!
//! One search gets a hard wall-clock budget (default 12 s) split across the
//! cache, fast-path, and slow-path stages. The manager tracks elapsed time
//! against a monotonic clock, hands out per-stage timeouts bounded by what
//! is left, and records named checkpoints for diagnostics.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Pipeline stage identifiers used for budget allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cache,
    FastPath,
    SlowPath,
}

/// Per-stage budget allocation.
///
/// Invariant (validated at construction): the sum of the stage timeouts must
/// not exceed the total budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Total wall-clock budget for one search.
    pub total: Duration,
    /// Cache lookup allowance.
    pub cache_timeout: Duration,
    /// HTTP fast-path allowance.
    pub fastpath_timeout: Duration,
    /// Browser slow-path allowance.
    pub slowpath_timeout: Duration,
    /// Below this remainder the search counts as exhausted.
    pub min_remaining: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_secs_f64(12.0),
            cache_timeout: Duration::from_secs_f64(0.5),
            fastpath_timeout: Duration::from_secs_f64(4.0),
            slowpath_timeout: Duration::from_secs_f64(6.5),
            min_remaining: Duration::from_secs_f64(1.0),
        }
    }
}

impl BudgetConfig {
    /// Validate the stage-sum invariant.
    pub fn validate(&self) -> anyhow::Result<()> {
        let sum = self.cache_timeout + self.fastpath_timeout + self.slowpath_timeout;
        if sum > self.total {
            anyhow::bail!(
                "sum of stage timeouts ({:.1?}) exceeds total budget ({:.1?})",
                sum,
                self.total
            );
        }
        Ok(())
    }
}

/// Snapshot of budget usage, returned inside non-success results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetReport {
    pub total: Duration,
    pub elapsed: Duration,
    pub remaining: Duration,
    /// Checkpoint name to seconds-from-start. `BTreeMap` keeps the report
    /// output stable across runs.
    pub checkpoints: BTreeMap<String, f64>,
    pub is_exhausted: bool,
}

/// Tracks wall time for one search and allocates per-stage timeouts.
///
/// Owned by the orchestrator for the lifetime of a single search; never
/// shared across searches.
#[derive(Debug)]
pub struct BudgetManager {
    config: BudgetConfig,
    started_at: Option<Instant>,
    checkpoints: BTreeMap<String, f64>,
}

impl BudgetManager {
    #[must_use]
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            started_at: None,
            checkpoints: BTreeMap::new(),
        }
    }

    /// Capture the monotonic start time and clear checkpoints.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.checkpoints.clear();
    }

    /// Elapsed time since `start()`; zero if not started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.map_or(Duration::ZERO, |t| t.elapsed())
    }

    /// Remaining budget, saturating at zero.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.config.total.saturating_sub(self.elapsed())
    }

    /// Whether enough budget remains to run a full stage.
    #[must_use]
    pub fn can_execute(&self, stage: Stage) -> bool {
        self.remaining() >= self.stage_timeout(stage)
    }

    /// Timeout to apply to a stage: its allocation, bounded by what is left.
    #[must_use]
    pub fn timeout_for(&self, stage: Stage) -> Duration {
        self.stage_timeout(stage).min(self.remaining())
    }

    /// Record `elapsed` under `name`; repeated writes overwrite.
    pub fn checkpoint(&mut self, name: &str) {
        self.checkpoints
            .insert(name.to_string(), self.elapsed().as_secs_f64());
    }

    /// True once the remainder drops below the configured minimum.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() < self.config.min_remaining
    }

    #[must_use]
    pub fn report(&self) -> BudgetReport {
        BudgetReport {
            total: self.config.total,
            elapsed: self.elapsed(),
            remaining: self.remaining(),
            checkpoints: self.checkpoints.clone(),
            is_exhausted: self.is_exhausted(),
        }
    }

    fn stage_timeout(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Cache => self.config.cache_timeout,
            Stage::FastPath => self.config.fastpath_timeout,
            Stage::SlowPath => self.config.slowpath_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> BudgetConfig {
        BudgetConfig {
            total: Duration::from_millis(200),
            cache_timeout: Duration::from_millis(20),
            fastpath_timeout: Duration::from_millis(80),
            slowpath_timeout: Duration::from_millis(90),
            min_remaining: Duration::from_millis(10),
        }
    }

    #[test]
    fn default_allocation_is_valid() {
        BudgetConfig::default().validate().expect("defaults satisfy the sum invariant");
    }

    #[test]
    fn oversubscribed_allocation_is_rejected() {
        let config = BudgetConfig {
            total: Duration::from_secs(5),
            ..BudgetConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn elapsed_is_zero_before_start() {
        let manager = BudgetManager::new(short_config());
        assert_eq!(manager.elapsed(), Duration::ZERO);
        assert_eq!(manager.remaining(), Duration::from_millis(200));
    }

    #[test]
    fn remaining_never_goes_negative() {
        let mut manager = BudgetManager::new(BudgetConfig {
            total: Duration::from_millis(1),
            cache_timeout: Duration::from_millis(1),
            fastpath_timeout: Duration::ZERO,
            slowpath_timeout: Duration::ZERO,
            min_remaining: Duration::ZERO,
        });
        manager.start();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(manager.remaining(), Duration::ZERO);
    }

    #[test]
    fn stage_timeout_is_bounded_by_remaining() {
        let mut manager = BudgetManager::new(short_config());
        manager.start();
        std::thread::sleep(Duration::from_millis(150));
        let timeout = manager.timeout_for(Stage::SlowPath);
        assert!(timeout <= Duration::from_millis(50));
    }

    #[test]
    fn checkpoint_overwrites_on_rewrite() {
        let mut manager = BudgetManager::new(short_config());
        manager.start();
        manager.checkpoint("cache_miss");
        let first = manager.report().checkpoints["cache_miss"];
        std::thread::sleep(Duration::from_millis(10));
        manager.checkpoint("cache_miss");
        let second = manager.report().checkpoints["cache_miss"];
        assert!(second >= first);
        assert_eq!(manager.report().checkpoints.len(), 1);
    }

    #[test]
    fn start_clears_checkpoints() {
        let mut manager = BudgetManager::new(short_config());
        manager.start();
        manager.checkpoint("cache_miss");
        manager.start();
        assert!(manager.report().checkpoints.is_empty());
    }

    #[test]
    fn exhaustion_tracks_min_remaining() {
        let mut manager = BudgetManager::new(BudgetConfig {
            total: Duration::from_millis(30),
            cache_timeout: Duration::from_millis(5),
            fastpath_timeout: Duration::from_millis(10),
            slowpath_timeout: Duration::from_millis(10),
            min_remaining: Duration::from_millis(25),
        });
        manager.start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(manager.is_exhausted());
    }
}
