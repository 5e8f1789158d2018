//! Per-queue counters

use std::sync::atomic::{AtomicI64, Ordering};

/// Queue level stats
///
/// `open_reads` counts items currently held by clients through reliable
/// reads. It is informational only.
#[derive(Debug, Default)]
pub struct Stats {
    open_reads: AtomicI64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` (positive on open, negative on close/abort)
    pub fn update_open_reads(&self, delta: i64) {
        self.open_reads.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn open_reads(&self) -> i64 {
        self.open_reads.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_update_open_reads() {
        let stats = Stats::new();
        assert_eq!(stats.open_reads(), 0);
        stats.update_open_reads(1);
        stats.update_open_reads(1);
        stats.update_open_reads(-1);
        assert_eq!(stats.open_reads(), 1);
    }

    #[test]
    fn test_concurrent_updates_balance_out() {
        let stats = Arc::new(Stats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.update_open_reads(1);
                        stats.update_open_reads(-1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.open_reads(), 0);
    }
}
