//! Engine configuration.

/// Default number of attempts for one stats recomputation.
pub const DEFAULT_RECOMPUTE_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Attempts per recomputation before reporting stats as lagging (min 1).
    pub recompute_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recompute_attempts: DEFAULT_RECOMPUTE_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    pub fn with_recompute_attempts(mut self, attempts: u32) -> Self {
        self.recompute_attempts = attempts.max(1);
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - REMEDY_RECOMPUTE_ATTEMPTS (optional, default: 2, min: 1)
    pub fn from_env() -> Self {
        let attempts = std::env::var("REMEDY_RECOMPUTE_ATTEMPTS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_RECOMPUTE_ATTEMPTS);
        Self::default().with_recompute_attempts(attempts)
    }
}
