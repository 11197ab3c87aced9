#![crate_name = "leakwatch"]
#![crate_type = "lib"]

//! # Leakwatch
//!
//! An in-process allocation tracker to detect memory leaks and measure peak memory usage in tests.
//!
//! ## Introduction
//!
//! The library provides the [`AllocationTracker`], a registry where the code under test reports
//! each allocation (address, size and where it came from) and each deallocation.
//! From the registry the tracker derives whether there are leaks, how many and how big they are,
//! the current and peak memory usage, and a human-readable [`Report`].
//!
//! The tracker does **not** replace the global allocator: it only knows what you tell it.
//! Addresses are opaque keys and are never dereferenced.
//!
//! ## Usage
//!
//! ### Cargo.toml
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! leakwatch = "0.1"
//! ```
//!
//! ### Tracking allocations
//!
//! Create a tracker for your test and report allocations and deallocations to it:
//!
//! ```rust
//! use leakwatch::AllocationTracker;
//!
//! let tracker = AllocationTracker::new();
//!
//! let buffer = vec![0u8; 400];
//! // the origin is the file and line of this call
//! tracker.track_allocation(buffer.as_ptr(), buffer.len());
//!
//! assert!(tracker.has_leaks());
//! assert_eq!(tracker.leak_count(), 1);
//! assert_eq!(tracker.leak_size(), 400);
//!
//! tracker.record_deallocation(buffer.as_ptr());
//! assert!(!tracker.has_leaks());
//! assert_eq!(tracker.peak_usage(), 400);
//! ```
//!
//! The origin can also be given explicitly with [`AllocationTracker::record_allocation`]:
//!
//! ```rust
//! use leakwatch::{AllocationTracker, Origin};
//!
//! let tracker = AllocationTracker::new();
//! tracker.record_allocation(0x1000usize, 64, Origin::new("pool.rs", 12));
//! assert_eq!(tracker.leaks()[0].origin().to_string(), "pool.rs:12");
//! ```
//!
//! ### Accessing the report
//!
//! ```rust
//! use leakwatch::AllocationTracker;
//!
//! let tracker = AllocationTracker::new();
//! tracker.record_allocation(0x1000usize, 4000, ("cache.rs", 7));
//!
//! // print to stdout
//! tracker.print_report();
//!
//! // or render it yourself
//! let report = tracker.report();
//! assert_eq!(report.stats().leak_count, 1);
//! println!("{report}");
//! ```
//!
//! ## Global tracker
//!
//! When passing a tracker around is not convenient, a process-wide tracker is available with [`global`].
//! Since it is shared by everything in the process, call [`AllocationTracker::reset`] before each scenario.
//!
//! ```rust
//! leakwatch::global().reset();
//! leakwatch::global().record_allocation(0x2000usize, 16, ("main.rs", 1));
//! assert_eq!(leakwatch::global().leak_count(), 1);
//! ```
//!
//! ## Logging
//!
//! The tracker emits [`tracing`] events: recorded allocations and deallocations at `TRACE` level,
//! ignored events and resets at `DEBUG` level. It never installs a subscriber.
//!

#![doc(html_playground_url = "https://play.rust-lang.org")]

mod config;
mod record;
mod report;
mod tracker;

use std::sync::OnceLock;

pub use self::config::{DEFAULT_REDUCTION_THRESHOLD, TrackerConfig};
pub use self::record::{Address, AllocationRecord, Origin};
pub use self::report::{Report, TrackerStats};
pub use self::tracker::AllocationTracker;

static GLOBAL_TRACKER: OnceLock<AllocationTracker> = OnceLock::new();

/// Returns the process-wide [`AllocationTracker`].
///
/// The tracker is created with the default configuration on first use and lives until the process exits.
/// It is never re-created: use [`AllocationTracker::reset`] to start over.
pub fn global() -> &'static AllocationTracker {
    GLOBAL_TRACKER.get_or_init(AllocationTracker::new)
}
