/// Default threshold, in percent, above which the report notices a memory reduction.
pub const DEFAULT_REDUCTION_THRESHOLD: f64 = 30.0;

/// Configuration for an [`crate::AllocationTracker`].
///
/// ```rust
/// use leakwatch::{AllocationTracker, TrackerConfig};
///
/// let tracker = AllocationTracker::with_config(
///     TrackerConfig::default().with_reduction_threshold(50.0),
/// );
/// assert_eq!(tracker.config().reduction_threshold(), 50.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    reduction_threshold: f64,
}

impl TrackerConfig {
    /// Creates the default configuration.
    pub const fn new() -> Self {
        Self {
            reduction_threshold: DEFAULT_REDUCTION_THRESHOLD,
        }
    }

    /// Sets the reduction percentage which must be exceeded for the report to show the reduction notice.
    pub const fn with_reduction_threshold(mut self, percent: f64) -> Self {
        self.reduction_threshold = percent;
        self
    }

    pub const fn reduction_threshold(&self) -> f64 {
        self.reduction_threshold
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
