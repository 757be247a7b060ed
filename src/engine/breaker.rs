//! Circuit breaker guarding the HTTP fast path.
//!
//! The breaker tracks consecutive fast-path failures against a single
//! upstream. At the failure threshold it opens for a fixed duration, during
//! which the orchestrator routes straight to the slow path. Any success, or
//! the open deadline passing, closes it again.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// Breaker configuration.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub fail_threshold: u32,
    /// How long the circuit stays open.
    pub open_duration: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            fail_threshold: 5,
            open_duration: Duration::from_secs(60),
        }
    }
}

/// Hit/miss counters across both paths.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreakerMetrics {
    pub fastpath_hits: u64,
    pub fastpath_misses: u64,
    pub slowpath_hits: u64,
    pub slowpath_failures: u64,
}

impl BreakerMetrics {
    #[must_use]
    pub fn fastpath_success_rate(&self) -> f64 {
        let total = self.fastpath_hits + self.fastpath_misses;
        if total == 0 {
            return 0.0;
        }
        self.fastpath_hits as f64 / total as f64
    }

    #[must_use]
    pub fn slowpath_success_rate(&self) -> f64 {
        let total = self.slowpath_hits + self.slowpath_failures;
        if total == 0 {
            return 0.0;
        }
        self.slowpath_hits as f64 / total as f64
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    fail_count: u32,
    open_until: Option<Instant>,
    metrics: BreakerMetrics,
}

/// Process-wide circuit breaker, one instance per upstream.
///
/// All mutations are read-modify-write under one lock so concurrent searches
/// cannot lose counter updates.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Whether the circuit is currently open.
    ///
    /// Auto-closes (resetting the failure count) once the open deadline has
    /// passed.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();
        match state.open_until {
            None => false,
            Some(until) => {
                if Instant::now() >= until {
                    state.fail_count = 0;
                    state.open_until = None;
                    info!("circuit breaker closed (auto-recovery)");
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a fast-path success: closes the circuit immediately.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        state.fail_count = 0;
        state.open_until = None;
        state.metrics.fastpath_hits += 1;
    }

    /// Record a fast-path failure; opens the circuit at the threshold.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.fail_count += 1;
        state.metrics.fastpath_misses += 1;
        if state.fail_count >= self.config.fail_threshold && state.open_until.is_none() {
            state.open_until = Some(Instant::now() + self.config.open_duration);
            warn!(
                fail_count = state.fail_count,
                threshold = self.config.fail_threshold,
                open_for_s = self.config.open_duration.as_secs_f64(),
                "circuit breaker opened, fast path suspended"
            );
        }
    }

    pub fn record_slowpath_hit(&self) {
        self.state.lock().metrics.slowpath_hits += 1;
    }

    pub fn record_slowpath_failure(&self) {
        self.state.lock().metrics.slowpath_failures += 1;
    }

    /// Remaining open time, zero when closed.
    #[must_use]
    pub fn remaining_open(&self) -> Duration {
        let state = self.state.lock();
        state
            .open_until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(Instant::now()))
    }

    /// Snapshot of the hit/miss counters.
    #[must_use]
    pub fn metrics(&self) -> BreakerMetrics {
        self.state.lock().metrics
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
