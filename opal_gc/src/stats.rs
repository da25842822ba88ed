//! Collector statistics.
//!
//! Elapsed time is gathered in three buckets — `ALLOCATION`, `FULL_GC`
//! and `EXECUTION` — using a scoped timer pattern: start a
//! [`PhaseTimer`] on entry, accumulate its elapsed time on exit. The
//! execution bucket spans the lifetime of the collector and is flushed
//! when it is torn down, just before the summary is printed.

use std::time::{Duration, Instant};

/// Statistics about allocation and collection activity.
///
/// The core is single-threaded (§ cooperative scheduling), so counters
/// are plain integers.
#[derive(Debug, Default)]
pub struct GcStats {
    // =========================================================================
    // Time buckets
    // =========================================================================
    /// Time spent inside `allocate`.
    pub allocation: Duration,
    /// Time spent in full collection cycles.
    pub full_gc: Duration,
    /// Total lifetime of the collector.
    pub execution: Duration,

    // =========================================================================
    // Allocation counters
    // =========================================================================
    /// Total bytes handed out since start.
    pub bytes_allocated: u64,
    /// Total objects handed out since start.
    pub objects_allocated: u64,

    // =========================================================================
    // Collection counters
    // =========================================================================
    /// Number of full collections.
    pub collections: u64,
    /// Total bytes reclaimed by sweeping.
    pub bytes_freed: u64,
    /// Total objects reclaimed by sweeping.
    pub objects_freed: u64,
    /// Bytes live after the most recent collection.
    pub live_bytes: u64,
}

impl GcStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one allocation.
    #[inline]
    pub fn record_allocation(&mut self, size: usize, elapsed: Duration) {
        self.bytes_allocated += size as u64;
        self.objects_allocated += 1;
        self.allocation += elapsed;
    }

    /// Record one full collection.
    pub fn record_full_gc(
        &mut self,
        elapsed: Duration,
        bytes_freed: usize,
        objects_freed: usize,
        live_bytes: usize,
    ) {
        self.collections += 1;
        self.bytes_freed += bytes_freed as u64;
        self.objects_freed += objects_freed as u64;
        self.live_bytes = live_bytes as u64;
        self.full_gc += elapsed;
    }

    /// Average pause of a full collection.
    pub fn avg_gc_pause(&self) -> Duration {
        if self.collections == 0 {
            return Duration::ZERO;
        }
        self.full_gc / self.collections as u32
    }

    /// Print the teardown summary.
    pub fn print_summary(&self) {
        eprintln!("=== GC Statistics ===");
        eprintln!(
            "ALLOCATION: {} ms, FULL_GC: {} ms, EXECUTION: {} ms",
            self.allocation.as_millis(),
            self.full_gc.as_millis(),
            self.execution.as_millis()
        );
        eprintln!(
            "Allocations: {} objects, {}",
            self.objects_allocated,
            format_bytes(self.bytes_allocated)
        );
        eprintln!(
            "Collections: {} ({} objects, {} freed, {:?} avg pause)",
            self.collections,
            self.objects_freed,
            format_bytes(self.bytes_freed),
            self.avg_gc_pause()
        );
    }
}

/// Format bytes in human-readable form.
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Timer for one statistics bucket scope.
pub struct PhaseTimer {
    start: Instant,
}

impl PhaseTimer {
    /// Start timing.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed duration.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time without consuming the timer.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_recording() {
        let mut stats = GcStats::new();
        stats.record_allocation(1024, Duration::from_micros(5));
        stats.record_allocation(2048, Duration::from_micros(5));

        assert_eq!(stats.bytes_allocated, 3072);
        assert_eq!(stats.objects_allocated, 2);
        assert_eq!(stats.allocation, Duration::from_micros(10));
    }

    #[test]
    fn test_gc_recording_and_average() {
        let mut stats = GcStats::new();
        stats.record_full_gc(Duration::from_micros(100), 512, 4, 256);
        stats.record_full_gc(Duration::from_micros(300), 128, 1, 384);

        assert_eq!(stats.collections, 2);
        assert_eq!(stats.bytes_freed, 640);
        assert_eq!(stats.objects_freed, 5);
        assert_eq!(stats.live_bytes, 384);
        assert_eq!(stats.avg_gc_pause(), Duration::from_micros(200));
    }

    #[test]
    fn test_avg_pause_with_no_collections() {
        assert_eq!(GcStats::new().avg_gc_pause(), Duration::ZERO);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_phase_timer_accumulates() {
        let timer = PhaseTimer::start();
        let elapsed = timer.stop();
        assert!(elapsed < Duration::from_secs(1));
    }
}
