//! Shared download progress
//!
//! `total` is fixed when the counter is created, before any worker
//! starts. `completed` only moves through [`Progress::record`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct Progress {
    completed: AtomicU64,
    total: u64,
    every: u64,
}

impl Progress {
    /// A counter for `total` messages that reports every `every`
    /// completions. A stride of zero is treated as one.
    #[must_use]
    pub const fn new(total: u64, every: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total,
            every: if every == 0 { 1 } else { every },
        }
    }

    /// Count one saved message and return the new completed count.
    pub fn record(&self) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug_assert!(completed <= self.total, "more saves than enumerated messages");
        completed
    }

    /// The progress line for `completed`, if it falls on the stride.
    #[must_use]
    pub fn report(&self, completed: u64) -> Option<String> {
        (completed > 0 && completed % self.every == 0).then(|| {
            format!(
                "Progress: {completed} / {} ({:.2}%)",
                self.total,
                self.percent(completed)
            )
        })
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent(&self, completed: u64) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        completed as f64 / self.total as f64 * 100.0
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }
}
