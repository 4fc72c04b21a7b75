//! Replica configuration.

/// Configuration for a document replica.
#[derive(Debug, Clone)]
pub struct DocConfig {
    /// Maximum number of received operations held back while waiting for
    /// their causal dependencies.
    pub max_pending: usize,
    /// Catch observer panics and count them as observer failures instead of
    /// unwinding through the mutating call.
    pub isolate_observer_panics: bool,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            max_pending: 10_000,
            isolate_observer_panics: true,
        }
    }
}
