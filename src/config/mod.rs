//! Engine configuration.
//!
//! All knobs ship with working defaults and can be overridden from the
//! environment at process start (`PRICESCOUT_*` variables). Invalid values
//! fall back to the default with a warning rather than aborting startup.

use std::time::Duration;

use tracing::warn;

use crate::engine::budget::BudgetConfig;
use crate::engine::breaker::BreakerConfig;

/// Which slow-path backend to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowPathBackend {
    /// Shared headless Chromium via CDP.
    Chromium,
    /// No-op backend for memory-constrained deployments; every call reports
    /// not-found(reason=disabled) at zero runtime cost.
    Disabled,
}

/// Fast-path (HTTP) tuning.
#[derive(Debug, Clone)]
pub struct FastPathConfig {
    /// Upstream search endpoint.
    pub search_base: String,
    /// Upstream product-detail endpoint.
    pub product_base: String,
    /// Per-request cap inside the search phase.
    pub request_timeout: Duration,
    /// Per-request cap for product-detail fetches.
    pub product_timeout: Duration,
    /// Responses shorter than this are treated as invalid.
    pub min_html_length: usize,
    /// Responses longer than this are trusted without a fingerprint.
    pub trust_large_html_size: usize,
    /// How many search candidates one fast-path run may try.
    pub max_candidates: usize,
    /// How many product detail pages one fast-path run may fetch.
    pub max_product_fetches: usize,
    pub user_agent: String,
    pub referer: String,
}

impl Default for FastPathConfig {
    fn default() -> Self {
        Self {
            search_base: "https://search.danawa.com/dsearch.php".to_string(),
            product_base: "https://prod.danawa.com/info/".to_string(),
            request_timeout: Duration::from_secs(4),
            product_timeout: Duration::from_secs(6),
            min_html_length: 5000,
            trust_large_html_size: 50_000,
            max_candidates: 3,
            max_product_fetches: 4,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36"
                .to_string(),
            referer: "https://www.danawa.com/".to_string(),
        }
    }
}

/// Slow-path (browser) tuning.
#[derive(Debug, Clone)]
pub struct SlowPathConfig {
    pub backend: SlowPathBackend,
    /// Maximum simultaneous page lifetimes.
    pub browser_concurrency: usize,
    /// Cushion added to the stage remainder when acquiring the semaphore.
    pub semaphore_cushion: Duration,
    /// Randomized delay bounds between detail fetches.
    pub rate_limit_min: Duration,
    pub rate_limit_max: Duration,
    pub user_agent: String,
    pub referer: String,
}

impl Default for SlowPathConfig {
    fn default() -> Self {
        let fast = FastPathConfig::default();
        Self {
            backend: SlowPathBackend::Chromium,
            browser_concurrency: 2,
            semaphore_cushion: Duration::from_secs(2),
            rate_limit_min: Duration::from_secs_f64(0.5),
            rate_limit_max: Duration::from_secs_f64(1.5),
            user_agent: fast.user_agent,
            referer: fast.referer,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub budget: BudgetConfig,
    pub breaker: BreakerConfig,
    pub fastpath: FastPathConfig,
    pub slowpath: SlowPathConfig,
    pub cache_ttl_positive: Duration,
    pub cache_ttl_negative: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            breaker: BreakerConfig::default(),
            fastpath: FastPathConfig::default(),
            slowpath: SlowPathConfig::default(),
            cache_ttl_positive: Duration::from_secs(21_600),
            cache_ttl_negative: Duration::from_secs(60),
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                warn!(var = name, value = %raw, "invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(v) => v,
            Err(_) => {
                warn!(var = name, value = %raw, "invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.budget.total = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_TOTAL_BUDGET_S",
            config.budget.total.as_secs_f64(),
        ));
        config.budget.cache_timeout = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_CACHE_TIMEOUT_S",
            config.budget.cache_timeout.as_secs_f64(),
        ));
        config.budget.fastpath_timeout = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_FASTPATH_TIMEOUT_S",
            config.budget.fastpath_timeout.as_secs_f64(),
        ));
        config.budget.slowpath_timeout = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_SLOWPATH_TIMEOUT_S",
            config.budget.slowpath_timeout.as_secs_f64(),
        ));

        config.cache_ttl_positive = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_CACHE_TTL_POSITIVE_S",
            config.cache_ttl_positive.as_secs_f64(),
        ));
        config.cache_ttl_negative = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_CACHE_TTL_NEGATIVE_S",
            config.cache_ttl_negative.as_secs_f64(),
        ));

        config.breaker.fail_threshold = env_usize(
            "PRICESCOUT_FASTPATH_FAIL_THRESHOLD",
            config.breaker.fail_threshold as usize,
        ) as u32;
        config.breaker.open_duration = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_FASTPATH_OPEN_DURATION_S",
            config.breaker.open_duration.as_secs_f64(),
        ));

        config.fastpath.min_html_length = env_usize(
            "PRICESCOUT_FASTPATH_MIN_HTML_LENGTH",
            config.fastpath.min_html_length,
        );
        config.fastpath.trust_large_html_size = env_usize(
            "PRICESCOUT_FASTPATH_TRUST_LARGE_HTML_SIZE",
            config.fastpath.trust_large_html_size,
        );
        config.fastpath.search_base =
            env_string("PRICESCOUT_SEARCH_BASE", &config.fastpath.search_base);
        config.fastpath.product_base =
            env_string("PRICESCOUT_PRODUCT_BASE", &config.fastpath.product_base);

        config.slowpath.browser_concurrency = env_usize(
            "PRICESCOUT_BROWSER_CONCURRENCY",
            config.slowpath.browser_concurrency,
        )
        .max(1);
        config.slowpath.backend =
            match env_string("PRICESCOUT_SLOWPATH_BACKEND", "chromium").to_lowercase().as_str() {
                "disabled" => SlowPathBackend::Disabled,
                _ => SlowPathBackend::Chromium,
            };
        config.slowpath.rate_limit_min = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_RATE_LIMIT_MIN_S",
            config.slowpath.rate_limit_min.as_secs_f64(),
        ));
        config.slowpath.rate_limit_max = Duration::from_secs_f64(env_f64(
            "PRICESCOUT_RATE_LIMIT_MAX_S",
            config.slowpath.rate_limit_max.as_secs_f64(),
        ));

        config
    }

    /// Validate cross-field invariants.
    ///
    /// The semaphore cushion must stay small relative to the slow-path
    /// stage timeout, otherwise a queued search could overshoot the total
    /// budget while waiting for a page slot.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.budget.validate()?;
        if self.slowpath.semaphore_cushion > self.budget.slowpath_timeout {
            anyhow::bail!(
                "semaphore cushion ({:?}) exceeds slow path timeout ({:?})",
                self.slowpath.semaphore_cushion,
                self.budget.slowpath_timeout
            );
        }
        if self.slowpath.rate_limit_min > self.slowpath.rate_limit_max {
            anyhow::bail!("rate limit min exceeds max");
        }
        if self.slowpath.browser_concurrency == 0 {
            anyhow::bail!("browser concurrency must be at least 1");
        }
        Ok(())
    }
}
