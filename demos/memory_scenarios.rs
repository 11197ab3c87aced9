//! Runs the leak detection scenarios against the global tracker and prints a report for each one.

use leakwatch::AllocationTracker;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tracker = leakwatch::global();

    println!("======================================");
    println!("       LEAKWATCH - MEMORY TESTS       ");
    println!("======================================");

    leak_detection(tracker);
    no_leak_when_freed(tracker);
    multiple_allocations(tracker);
    memory_reduction(tracker);
    peak_memory(tracker);

    println!();
    println!("======================================");
    println!("     ALL MEMORY TESTS COMPLETED!      ");
    println!("======================================");

    Ok(())
}

fn check(passed: bool, pass: &str, fail: &str) {
    if passed {
        println!("PASS: {pass}");
    } else {
        println!("FAIL: {fail}");
    }
}

fn scenario(tracker: &AllocationTracker, title: &str) {
    println!();
    println!("--- {title} ---");
    tracker.reset();
}

fn leak_detection(tracker: &AllocationTracker) {
    scenario(tracker, "Test 1: Memory Leak Detection");

    let leaked = vec![0i32; 100];
    tracker.track_allocation(leaked.as_ptr(), size_of_val(leaked.as_slice()));

    check(
        tracker.has_leaks(),
        "Memory leak detected",
        "Memory leak not detected",
    );
    tracker.print_report();
}

fn no_leak_when_freed(tracker: &AllocationTracker) {
    scenario(tracker, "Test 2: No Leak When Properly Freed");

    let memory = vec![0i32; 100];
    tracker.track_allocation(memory.as_ptr(), size_of_val(memory.as_slice()));
    tracker.record_deallocation(memory.as_ptr());
    drop(memory);

    check(
        !tracker.has_leaks(),
        "No memory leaks",
        "Unexpected memory leak",
    );
    tracker.print_report();
}

fn multiple_allocations(tracker: &AllocationTracker) {
    scenario(tracker, "Test 3: Multiple Allocations");

    let allocations: Vec<Vec<i32>> = (0..10).map(|_| vec![0i32; 50]).collect();
    for allocation in &allocations {
        tracker.track_allocation(allocation.as_ptr(), size_of_val(allocation.as_slice()));
    }

    let (freed, kept) = allocations.split_at(allocations.len() / 2);
    for allocation in freed {
        tracker.record_deallocation(allocation.as_ptr());
    }
    check(
        tracker.leak_count() == 5,
        "Correct leak count",
        "Incorrect leak count",
    );

    for allocation in kept {
        tracker.record_deallocation(allocation.as_ptr());
    }
    tracker.print_report();
}

fn memory_reduction(tracker: &AllocationTracker) {
    scenario(tracker, "Test 4: Memory Reduction");

    let allocations: Vec<Vec<i32>> = (0..100).map(|_| vec![0i32; 1000]).collect();
    for allocation in &allocations {
        tracker.track_allocation(allocation.as_ptr(), size_of_val(allocation.as_slice()));
    }

    let initial_usage = tracker.current_usage();
    println!("Initial memory usage: {initial_usage} bytes");

    let (kept, released) = allocations.split_at(35);
    for allocation in released {
        tracker.record_deallocation(allocation.as_ptr());
    }

    let optimized_usage = tracker.current_usage();
    let reduction = tracker.reduction_percent();
    println!("Optimized memory usage: {optimized_usage} bytes");
    println!("Reduction: {reduction:.1}%");
    check(
        (60.0..=70.0).contains(&reduction),
        "Memory reduction achieved",
        "Memory reduction not achieved",
    );

    for allocation in kept {
        tracker.record_deallocation(allocation.as_ptr());
    }
    tracker.print_report();
}

fn peak_memory(tracker: &AllocationTracker) {
    scenario(tracker, "Test 5: Peak Memory Tracking");

    let first = vec![0i32; 1000];
    tracker.track_allocation(first.as_ptr(), size_of_val(first.as_slice()));
    let first_peak = tracker.peak_usage();

    let second = vec![0i32; 2000];
    tracker.track_allocation(second.as_ptr(), size_of_val(second.as_slice()));
    let second_peak = tracker.peak_usage();

    check(
        second_peak > first_peak,
        "Peak memory tracked correctly",
        "Peak memory tracking failed",
    );

    tracker.record_deallocation(first.as_ptr());
    tracker.record_deallocation(second.as_ptr());
    tracker.print_report();
}
