//! Failure queues: one per stage, shared by every worker of that stage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ScanError;
use crate::{FailureRecord, Stage};

/// Thread-safe, bounded, accumulate-all failure collector.
///
/// Keeps the first `capacity` records in arrival order; later ones are counted in
/// [`dropped`](Self::dropped) but not stored. Cloning shares the same queue.
#[derive(Clone, Debug)]
pub struct FailureQueue {
    stage: Stage,
    capacity: usize,
    records: Arc<Mutex<Vec<FailureRecord>>>,
    dropped: Arc<AtomicUsize>,
}

impl FailureQueue {
    /// `capacity` below 1 is raised to 1 so the first failure is always kept.
    pub fn new(stage: Stage, capacity: usize) -> Self {
        Self {
            stage,
            capacity: capacity.max(1),
            records: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn add(&self, error: ScanError) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.len() < self.capacity {
            records.push(FailureRecord {
                stage: self.stage,
                error,
            });
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.dropped() == 0
    }

    /// Failures that arrived after the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Take all stored records, leaving the queue empty. Call after the stage has drained.
    pub fn drain(&self) -> Vec<FailureRecord> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Log a short summary of what both queues captured. Call after joining both stages.
pub fn log_failure_summary(indexing: &FailureQueue, dispatch: &FailureQueue) {
    for q in [indexing, dispatch] {
        let kept = q.len();
        let dropped = q.dropped();
        if kept + dropped > 0 {
            log::warn!(
                "{} stage: {} item(s) failed{}",
                q.stage(),
                kept + dropped,
                if dropped > 0 {
                    format!(" ({} not recorded, queue full)", dropped)
                } else {
                    String::new()
                }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn err(i: usize) -> ScanError {
        ScanError::remote(format!("g{i}"), "down")
    }

    #[test]
    fn test_keeps_first_records_in_order() {
        let q = FailureQueue::new(Stage::Dispatch, 2);
        q.add(err(1));
        q.add(err(2));
        q.add(err(3));
        assert_eq!(q.len(), 2);
        assert_eq!(q.dropped(), 1);
        let records = q.drain();
        assert!(records[0].error.to_string().contains("g1"));
        assert!(records[1].error.to_string().contains("g2"));
        assert!(records.iter().all(|r| r.stage == Stage::Dispatch));
    }

    #[test]
    fn test_zero_capacity_keeps_first() {
        let q = FailureQueue::new(Stage::Indexing, 0);
        q.add(err(1));
        assert_eq!(q.len(), 1);
        assert!(!q.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let q = FailureQueue::new(Stage::Indexing, 1_000);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let q = q.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        q.add(err(t * 100 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.len(), 400);
        assert_eq!(q.dropped(), 0);
    }
}
