//! Fallback policy between the fast and slow paths.

use super::error::FastPathError;

/// Decides whether a fast-path failure is worth a browser attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionStrategy;

impl ExecutionStrategy {
    /// Timeouts, parse failures, and blocks may be transient or
    /// structure-specific, so the slow path gets a chance. A confirmed empty
    /// search is terminal: the browser budget is not spent re-confirming an
    /// empty catalog.
    #[must_use]
    pub fn should_fallback_to_slowpath(&self, error: &FastPathError) -> bool {
        match error {
            FastPathError::NoResults => false,
            FastPathError::Timeout
            | FastPathError::Parse(_)
            | FastPathError::Blocked(_)
            | FastPathError::ProductFetchFailed { .. } => true,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_results_is_terminal() {
        let strategy = ExecutionStrategy;
        assert!(!strategy.should_fallback_to_slowpath(&FastPathError::NoResults));
    }

    #[test]
    fn transient_failures_fall_back() {
        let strategy = ExecutionStrategy;
        assert!(strategy.should_fallback_to_slowpath(&FastPathError::Timeout));
        assert!(strategy.should_fallback_to_slowpath(&FastPathError::Parse("bad html".into())));
        assert!(strategy.should_fallback_to_slowpath(&FastPathError::Blocked("captcha".into())));
        assert!(strategy.should_fallback_to_slowpath(&FastPathError::ProductFetchFailed {
            product_id: "1".into(),
            reason: "detail 403".into(),
        }));
    }
}
