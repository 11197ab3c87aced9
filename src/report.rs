use std::fmt;

use crate::AllocationRecord;

const RULER_WIDTH: usize = 45;

/// A consistent snapshot of the tracker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Bytes ever allocated since the last reset.
    pub total_allocated: usize,
    /// Bytes ever freed since the last reset.
    pub total_freed: usize,
    /// Bytes currently in use.
    pub current_usage: usize,
    /// Highest value reached by `current_usage` since the last reset.
    pub peak_usage: usize,
    /// Number of live allocations.
    pub leak_count: usize,
    /// Sum of the sizes of the live allocations.
    pub leak_size: usize,
}

impl TrackerStats {
    /// Returns `true` if there is at least one live allocation.
    pub fn has_leaks(&self) -> bool {
        self.leak_count > 0
    }

    /// Relative drop, in percent, from the bytes ever allocated to the bytes currently in use.
    ///
    /// Returns `0.0` if nothing was allocated.
    pub fn reduction_percent(&self) -> f64 {
        if self.total_allocated == 0 {
            return 0.0;
        }

        let released = self.total_allocated.saturating_sub(self.current_usage);
        released as f64 / self.total_allocated as f64 * 100.0
    }
}

/// Memory report of an [`crate::AllocationTracker`].
///
/// The report is a snapshot: it is not updated after it has been taken.
/// Use its [`fmt::Display`] implementation to render it.
#[derive(Debug, Clone)]
pub struct Report {
    stats: TrackerStats,
    leaks: Vec<AllocationRecord>,
    reduction_threshold: f64,
}

impl Report {
    pub(crate) fn new(
        stats: TrackerStats,
        leaks: Vec<AllocationRecord>,
        reduction_threshold: f64,
    ) -> Self {
        Self {
            stats,
            leaks,
            reduction_threshold,
        }
    }

    /// Returns the counters at the time of the report.
    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// Returns the live allocations at the time of the report, ordered by address.
    pub fn leaks(&self) -> &[AllocationRecord] {
        &self.leaks
    }

    /// Returns the reduction percentage, if it exceeds the configured threshold.
    pub fn reduction_notice(&self) -> Option<f64> {
        let reduction = self.stats.reduction_percent();
        (reduction > self.reduction_threshold).then_some(reduction)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;

        writeln!(f)?;
        writeln!(f, "{:=^RULER_WIDTH$}", " MEMORY PROFILING REPORT ")?;
        writeln!(f, "Total Allocated: {} bytes", stats.total_allocated)?;
        writeln!(f, "Total Freed: {} bytes", stats.total_freed)?;
        writeln!(f, "Current Usage: {} bytes", stats.current_usage)?;
        writeln!(f, "Peak Usage: {} bytes", stats.peak_usage)?;
        writeln!(f, "Leaked Allocations: {}", stats.leak_count)?;
        writeln!(f)?;

        if self.leaks.is_empty() {
            writeln!(f, "No memory leaks detected!")?;
        } else {
            writeln!(f, "MEMORY LEAKS DETECTED:")?;
            for leak in &self.leaks {
                writeln!(
                    f,
                    "  Address: {}, Size: {}, File: {}, Line: {}",
                    leak.address(),
                    leak.size(),
                    leak.origin().file(),
                    leak.origin().line()
                )?;
            }
        }

        if let Some(reduction) = self.reduction_notice() {
            writeln!(f)?;
            writeln!(f, "Memory consumption reduced by {reduction:.1}%")?;
        }

        writeln!(f, "{:=<RULER_WIDTH$}", "")
    }
}
