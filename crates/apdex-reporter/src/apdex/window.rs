use crate::apdex::Tier;
use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// A classified user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub start_time: u64,
    pub response_time: u64,
    pub tier: Tier,
}

/// Fixed-capacity FIFO of the most recent samples, shared between the
/// ingestion handlers and the exporter.
///
/// Every operation takes the same mutex, so an enqueue (including its
/// eviction) and a snapshot are each observed as a single step.
#[derive(Debug)]
pub struct SlidingWindow {
    capacity: usize,
    samples: Mutex<VecDeque<Sample>>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `sample` as the newest entry, dropping the oldest when full.
    pub fn enqueue(&self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }

        let mut samples = self.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Point-in-time copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated
    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashSet,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    fn sample(response_time: u64) -> Sample {
        Sample {
            start_time: 0,
            response_time,
            tier: Tier::Satisfied,
        }
    }

    fn response_times(window: &SlidingWindow) -> Vec<u64> {
        window.snapshot().iter().map(|s| s.response_time).collect()
    }

    #[test]
    fn test_window_fills_up_to_capacity() {
        let window = SlidingWindow::new(3);
        assert!(window.is_empty());

        window.enqueue(sample(1));
        window.enqueue(sample(2));
        assert_eq!(window.len(), 2);
        assert_eq!(response_times(&window), vec![1, 2]);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let window = SlidingWindow::new(3);
        for rt in 1..=10 {
            window.enqueue(sample(rt));
            assert_eq!(window.len(), std::cmp::min(3, rt as usize));
        }

        assert_eq!(response_times(&window), vec![8, 9, 10]);
    }

    #[test]
    fn test_zero_capacity_never_holds_samples() {
        let window = SlidingWindow::new(0);
        window.enqueue(sample(1));
        window.enqueue(sample(2));

        assert_eq!(window.len(), 0);
        assert!(window.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let window = SlidingWindow::new(2);
        window.enqueue(sample(1));
        let snapshot = window.snapshot();

        window.enqueue(sample(2));
        window.enqueue(sample(3));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].response_time, 1);
    }

    #[test]
    fn test_concurrent_enqueues_are_not_lost() {
        let window = Arc::new(SlidingWindow::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let window = window.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        window.enqueue(sample(t * 1000 + i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = response_times(&window);
        assert_eq!(seen.len(), 800);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 800, "no sample should appear twice");
    }

    #[test]
    fn test_concurrent_overflow_respects_capacity() {
        let window = Arc::new(SlidingWindow::new(50));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let window = window.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        window.enqueue(sample(i));
                        assert!(window.len() <= 50);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(window.len(), 50);
    }

    #[test]
    fn test_snapshot_never_sees_partial_enqueue() {
        const CAPACITY: usize = 16;
        const WRITERS: u64 = 4;
        const PER_WRITER: u64 = 5_000;

        let window = Arc::new(SlidingWindow::new(CAPACITY));
        let done = Arc::new(AtomicBool::new(false));

        let reader = thread::spawn({
            let window = window.clone();
            let done = done.clone();
            move || {
                let mut snapshots = 0usize;
                loop {
                    let snapshot = window.snapshot();
                    assert!(snapshot.len() <= CAPACITY);

                    let ids: HashSet<u64> = snapshot.iter().map(|s| s.start_time).collect();
                    assert_eq!(ids.len(), snapshot.len(), "duplicate sample in snapshot");

                    // Samples from one writer must keep their enqueue order
                    let mut last = [None::<u64>; WRITERS as usize];
                    for s in &snapshot {
                        let writer = (s.start_time / 1_000_000) as usize;
                        let seq = s.start_time % 1_000_000;
                        if let Some(prev) = last[writer] {
                            assert!(seq > prev, "writer {writer} out of order: {prev} then {seq}");
                        }
                        last[writer] = Some(seq);
                    }
                    snapshots += 1;
                    if done.load(Ordering::Acquire) {
                        break snapshots;
                    }
                }
            }
        });

        let writers: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let window = window.clone();
                thread::spawn(move || {
                    for seq in 0..PER_WRITER {
                        window.enqueue(Sample {
                            start_time: writer * 1_000_000 + seq,
                            response_time: seq,
                            tier: Tier::Satisfied,
                        });
                    }
                })
            })
            .collect();

        for handle in writers {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Release);

        assert!(reader.join().unwrap() > 0);
        assert_eq!(window.len(), CAPACITY);
    }
}
