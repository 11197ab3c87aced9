use std::collections::HashMap;
use std::io;

use parking_lot::Mutex;

use crate::{Address, AllocationRecord, Origin, Report, TrackerConfig, TrackerStats};

/// A registry of the live allocations reported by the caller, together with the running counters
/// used to detect leaks and measure memory usage.
///
/// The tracker never allocates, frees or dereferences the addresses it is given: they are opaque keys.
///
/// ## Example
///
/// ```rust
/// use leakwatch::AllocationTracker;
///
/// let tracker = AllocationTracker::new();
///
/// let data = vec![0u32; 100];
/// tracker.track_allocation(data.as_ptr(), data.len() * size_of::<u32>());
/// assert!(tracker.has_leaks());
///
/// tracker.record_deallocation(data.as_ptr());
/// assert!(!tracker.has_leaks());
/// ```
#[derive(Debug, Default)]
pub struct AllocationTracker {
    config: TrackerConfig,
    state: Mutex<TrackerState>,
}

/// Registry and counters; always updated together under the tracker lock.
#[derive(Debug, Default)]
struct TrackerState {
    live: HashMap<Address, AllocationRecord>,
    total_allocated: usize,
    total_freed: usize,
    current_usage: usize,
    peak_usage: usize,
}

impl TrackerState {
    fn leak_size(&self) -> usize {
        self.live
            .values()
            .fold(0usize, |acc, record| acc.saturating_add(record.size()))
    }

    fn stats(&self) -> TrackerStats {
        TrackerStats {
            total_allocated: self.total_allocated,
            total_freed: self.total_freed,
            current_usage: self.current_usage,
            peak_usage: self.peak_usage,
            leak_count: self.live.len(),
            leak_size: self.leak_size(),
        }
    }

    fn leaks(&self) -> Vec<AllocationRecord> {
        let mut leaks: Vec<_> = self.live.values().cloned().collect();
        leaks.sort_by_key(AllocationRecord::address);
        leaks
    }
}

impl AllocationTracker {
    /// Creates a new, empty [`AllocationTracker`] with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    /// Creates a new, empty [`AllocationTracker`] with the given configuration.
    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Returns the configuration of the tracker.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Records an allocation of `size` bytes at `address`, reported from `origin`.
    ///
    /// Null addresses are ignored.
    ///
    /// Recording an address which is still live replaces its record, but its size is added
    /// to the counters again without subtracting the previous one.
    pub fn record_allocation(
        &self,
        address: impl Into<Address>,
        size: usize,
        origin: impl Into<Origin>,
    ) {
        let address = address.into();
        if address.is_null() {
            tracing::debug!("ignoring allocation of {size} bytes at null address");
            return;
        }
        let origin = origin.into();
        tracing::trace!(%address, size, %origin, "recording allocation");

        // no events while the lock is held
        let previous = {
            let mut state = self.state.lock();
            let previous = state
                .live
                .insert(address, AllocationRecord::new(address, size, origin));

            state.total_allocated = state.total_allocated.saturating_add(size);
            state.current_usage = state.current_usage.saturating_add(size);
            if state.current_usage > state.peak_usage {
                state.peak_usage = state.current_usage;
            }
            previous
        };

        if let Some(previous) = previous {
            tracing::warn!(
                %address,
                previous_size = previous.size(),
                previous_origin = %previous.origin(),
                "address recorded while still live; its size is counted twice"
            );
        }
    }

    /// Records an allocation of `size` bytes at `address`, tagged with the caller location.
    #[track_caller]
    pub fn track_allocation(&self, address: impl Into<Address>, size: usize) {
        self.record_allocation(address, size, Origin::caller());
    }

    /// Records the deallocation of `address`.
    ///
    /// Addresses which are not live (never recorded, or already freed) are ignored.
    pub fn record_deallocation(&self, address: impl Into<Address>) {
        let address = address.into();

        let freed = {
            let mut state = self.state.lock();
            let size = state.live.remove(&address).map(|record| record.size());
            if let Some(size) = size {
                state.total_freed = state.total_freed.saturating_add(size);
                state.current_usage = state.current_usage.saturating_sub(size);
            }
            size
        };

        match freed {
            Some(size) => tracing::trace!(%address, size, "recorded deallocation"),
            None => tracing::debug!(%address, "ignoring deallocation of untracked address"),
        }
    }

    /// Returns `true` if there is at least one live allocation.
    pub fn has_leaks(&self) -> bool {
        !self.state.lock().live.is_empty()
    }

    /// Returns the number of live allocations.
    pub fn leak_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Returns the sum of the sizes of the live allocations.
    pub fn leak_size(&self) -> usize {
        self.state.lock().leak_size()
    }

    /// Returns the live allocations, ordered by address.
    pub fn leaks(&self) -> Vec<AllocationRecord> {
        self.state.lock().leaks()
    }

    /// Returns the bytes currently in use.
    pub fn current_usage(&self) -> usize {
        self.state.lock().current_usage
    }

    /// Returns the highest memory usage reached since the last reset.
    pub fn peak_usage(&self) -> usize {
        self.state.lock().peak_usage
    }

    /// Returns the bytes allocated since the last reset.
    pub fn total_allocated(&self) -> usize {
        self.state.lock().total_allocated
    }

    /// Returns the bytes freed since the last reset.
    pub fn total_freed(&self) -> usize {
        self.state.lock().total_freed
    }

    /// Returns all the counters, read at once.
    pub fn stats(&self) -> TrackerStats {
        self.state.lock().stats()
    }

    /// Returns the reduction percentage from the bytes ever allocated to the bytes currently in use.
    pub fn reduction_percent(&self) -> f64 {
        self.stats().reduction_percent()
    }

    /// Clears the registry and all the counters.
    pub fn reset(&self) {
        let discarded = std::mem::take(&mut *self.state.lock());
        tracing::debug!(
            discarded = discarded.live.len(),
            "allocation tracker reset"
        );
    }

    /// Takes a [`Report`] of the current state.
    pub fn report(&self) -> Report {
        let state = self.state.lock();
        Report::new(
            state.stats(),
            state.leaks(),
            self.config.reduction_threshold(),
        )
    }

    /// Writes the [`Report`] of the current state to `writer`.
    pub fn write_report<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: io::Write + ?Sized,
    {
        write!(writer, "{}", self.report())?;
        writer.flush()
    }

    /// Prints the [`Report`] of the current state to stdout.
    pub fn print_report(&self) {
        let stdout = io::stdout();
        if let Err(err) = self.write_report(&mut stdout.lock()) {
            tracing::warn!("failed to write memory report: {err}");
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn origin() -> Origin {
        Origin::new("tracker.rs", 1)
    }

    #[test]
    fn test_should_record_allocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x1000usize, 400, origin());

        assert!(tracker.has_leaks());
        assert_eq!(tracker.leak_count(), 1);
        assert_eq!(tracker.leak_size(), 400);
        assert_eq!(tracker.current_usage(), 400);
        assert_eq!(tracker.peak_usage(), 400);
        assert_eq!(tracker.total_allocated(), 400);
        assert_eq!(tracker.total_freed(), 0);
    }

    #[test]
    fn test_should_record_deallocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x1000usize, 400, origin());
        tracker.record_deallocation(0x1000usize);

        assert!(!tracker.has_leaks());
        assert_eq!(tracker.current_usage(), 0);
        assert_eq!(tracker.peak_usage(), 400);
        assert_eq!(tracker.total_freed(), 400);
    }

    #[test]
    fn test_should_ignore_null_allocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(Address::NULL, 128, origin());
        tracker.record_allocation(std::ptr::null::<u8>(), 64, origin());

        assert_eq!(tracker.stats(), TrackerStats::default());
    }

    #[test]
    fn test_should_ignore_untracked_deallocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x10usize, 32, origin());
        let before = tracker.stats();

        tracker.record_deallocation(0x20usize);
        tracker.record_deallocation(Address::NULL);
        assert_eq!(tracker.stats(), before);

        tracker.record_deallocation(0x10usize);
        let after_free = tracker.stats();
        tracker.record_deallocation(0x10usize);
        assert_eq!(tracker.stats(), after_free);
    }

    #[test]
    fn test_should_accept_zero_sized_allocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x10usize, 0, origin());

        assert!(tracker.has_leaks());
        assert_eq!(tracker.leak_count(), 1);
        assert_eq!(tracker.leak_size(), 0);
        assert_eq!(tracker.current_usage(), 0);
    }

    #[test]
    fn test_should_double_count_live_address_recorded_twice() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x10usize, 100, origin());
        tracker.record_allocation(0x10usize, 30, Origin::new("tracker.rs", 2));

        // the registry holds only the latest record, but both sizes are counted
        assert_eq!(tracker.leak_count(), 1);
        assert_eq!(tracker.leak_size(), 30);
        assert_eq!(tracker.total_allocated(), 130);
        assert_eq!(tracker.current_usage(), 130);
        assert_eq!(tracker.peak_usage(), 130);
        assert_eq!(tracker.leaks()[0].origin().line(), 2);

        tracker.record_deallocation(0x10usize);
        assert!(!tracker.has_leaks());
        assert_eq!(tracker.current_usage(), 100);
    }

    #[test]
    fn test_should_reuse_address_after_deallocation() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x10usize, 100, origin());
        tracker.record_deallocation(0x10usize);
        tracker.record_allocation(0x10usize, 50, origin());

        assert_eq!(tracker.leak_count(), 1);
        assert_eq!(tracker.leak_size(), 50);
        assert_eq!(tracker.current_usage(), 50);
        assert_eq!(tracker.total_allocated(), 150);
        assert_eq!(tracker.peak_usage(), 100);
    }

    #[test]
    fn test_should_track_peak_usage() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x1usize, 4000, origin());
        let first_peak = tracker.peak_usage();
        tracker.record_allocation(0x2usize, 8000, origin());
        let second_peak = tracker.peak_usage();
        tracker.record_deallocation(0x1usize);
        tracker.record_deallocation(0x2usize);

        assert_eq!(first_peak, 4000);
        assert_eq!(second_peak, 12000);
        assert_eq!(tracker.peak_usage(), 12000);
        assert_eq!(tracker.current_usage(), 0);
    }

    #[test]
    fn test_should_reset() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x1usize, 10, origin());
        tracker.record_allocation(0x2usize, 20, origin());
        tracker.record_deallocation(0x1usize);
        tracker.reset();

        assert!(!tracker.has_leaks());
        assert_eq!(tracker.stats(), TrackerStats::default());
        assert!(tracker.leaks().is_empty());
    }

    #[test]
    fn test_should_tag_allocation_with_caller() {
        let tracker = AllocationTracker::new();
        let line = line!() + 1;
        tracker.track_allocation(0x1usize, 8);

        let leaks = tracker.leaks();
        assert_eq!(leaks[0].origin().file(), file!());
        assert_eq!(leaks[0].origin().line(), line);
    }

    #[test]
    fn test_should_list_leaks_by_address() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x30usize, 3, origin());
        tracker.record_allocation(0x10usize, 1, origin());
        tracker.record_allocation(0x20usize, 2, origin());

        let addresses: Vec<_> = tracker.leaks().iter().map(|r| r.address().get()).collect();
        assert_eq!(addresses, vec![0x10, 0x20, 0x30]);
    }

    #[test]
    fn test_should_write_report() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0xbeefusize, 400, Origin::new("leaky.rs", 3));

        let mut out = Vec::new();
        tracker.write_report(&mut out).expect("failed to write report");
        let out = String::from_utf8(out).expect("report is not utf8");

        assert!(out.contains("Leaked Allocations: 1"));
        assert!(out.contains("Address: 0xbeef, Size: 400, File: leaky.rs, Line: 3"));
        assert!(tracker.has_leaks());
    }

    #[test]
    fn test_should_use_configured_reduction_threshold() {
        let tracker =
            AllocationTracker::with_config(TrackerConfig::default().with_reduction_threshold(80.0));
        tracker.record_allocation(0x1usize, 100, origin());
        tracker.record_allocation(0x2usize, 100, origin());
        tracker.record_deallocation(0x1usize);

        assert_eq!(tracker.reduction_percent(), 50.0);
        assert_eq!(tracker.report().reduction_notice(), None);
        assert_eq!(AllocationTracker::new().report().reduction_notice(), None);
    }

    #[test]
    fn test_should_saturate_counters_without_panicking() {
        let tracker = AllocationTracker::new();
        tracker.record_allocation(0x1usize, usize::MAX, origin());
        tracker.record_allocation(0x2usize, 10, origin());
        tracker.record_deallocation(0x2usize);

        // once saturated, current usage no longer matches the live sizes
        let stats = tracker.stats();
        assert_eq!(stats.total_allocated, usize::MAX);
        assert_eq!(stats.total_freed, 10);
        assert_eq!(stats.current_usage, usize::MAX - 10);
        assert_eq!(stats.peak_usage, usize::MAX);
        assert_eq!(stats.leak_count, 1);
        assert_eq!(stats.leak_size, usize::MAX);
    }
}
