//! # Bus configuration.
//!
//! [`BusConfig`] centralizes the settings an [`EventBus`](crate::EventBus)
//! is created with.
//!
//! ## Sentinel values
//! - `workers = 0` → no pool; every dispatch runs synchronously on the
//!   publisher's stack.

/// Configuration for an event bus instance.
#[derive(Clone, Copy, Debug)]
pub struct BusConfig {
    /// Hop budget stamped on tickets created by `publish` (advisory only).
    pub initial_hops: i64,
    /// Number of worker threads to start with (`0` = synchronous dispatch).
    pub workers: usize,
}

impl Default for BusConfig {
    /// Returns a configuration with:
    /// - `initial_hops = 100`;
    /// - `workers = 0` (synchronous dispatch).
    fn default() -> Self {
        Self {
            initial_hops: 100,
            workers: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.initial_hops, 100);
        assert_eq!(cfg.workers, 0);
    }
}
