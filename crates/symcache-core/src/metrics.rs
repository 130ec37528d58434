//! Resolution counters.

/// Counters for one engine instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionMetrics {
    /// Resolutions served from the persistent cache
    pub hits: u64,
    /// Resolutions that ran the locator because no entry existed
    pub cold_misses: u64,
    /// Entries that failed a content check and were re-resolved
    pub corruption_recoveries: u64,
    /// Entries that parsed but no longer resolved and were re-resolved
    pub stale_recoveries: u64,
    /// Resolutions that surfaced an error to the caller
    pub failures: u64,
    /// Store reads or writes that failed
    pub store_errors: u64,
}

impl ResolutionMetrics {
    /// Get hit rate as a percentage (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Every resolution that had to run a locator
    pub fn misses(&self) -> u64 {
        self.cold_misses + self.corruption_recoveries + self.stale_recoveries
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_cold_miss(&mut self) {
        self.cold_misses += 1;
    }

    pub fn record_corruption(&mut self) {
        self.corruption_recoveries += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale_recoveries += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn record_store_error(&mut self) {
        self.store_errors += 1;
    }
}
