use std::sync::Arc;

use leakwatch::AllocationTracker;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    init_log(Level::TRACE)?;

    let tracker = Arc::new(AllocationTracker::new());
    tracing::info!("Starting the application...");

    let mut handles = Vec::new();
    for worker in 0..4usize {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move {
            let buffers: Vec<Vec<u8>> = (0..8).map(|i| vec![0u8; 64 * (i + 1)]).collect();
            for buffer in &buffers {
                tracker.track_allocation(buffer.as_ptr(), buffer.len());
            }
            // the first worker "forgets" its last buffer
            let forgotten = usize::from(worker == 0);
            for buffer in &buffers[..buffers.len() - forgotten] {
                tracker.record_deallocation(buffer.as_ptr());
            }
            // double frees are ignored
            tracker.record_deallocation(buffers[0].as_ptr());
            buffers
        }));
    }

    let mut buffers = Vec::new();
    for handle in handles {
        buffers.push(handle.await?);
    }

    tracing::info!(
        "Application finished. Current usage {} bytes, peak {} bytes, {} leaks",
        tracker.current_usage(),
        tracker.peak_usage(),
        tracker.leak_count()
    );
    tracker.print_report();

    Ok(())
}

/// Logs the tracker events to stdout, with the thread which reported them.
fn init_log(level: Level) -> Result<(), Box<dyn std::error::Error>> {
    let stdout_logger = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stdout);

    let registry =
        tracing_subscriber::registry().with(stdout_logger.with_filter(LevelFilter::from(level)));

    tracing::subscriber::set_global_default(registry)?;

    Ok(())
}
