// src/buffer/fifo.rs

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use super::{AnalysisWindow, RingBuffer};

/// The bridge between the audio callback (producer) and the analysis side
/// (consumer). One producer and one consumer share a clone each.
///
/// The lock covers index arithmetic plus one window copy or swap, nothing else.
#[derive(Clone)]
pub struct WindowFifo {
    ring: Arc<Mutex<RingBuffer<AnalysisWindow>>>,
    dropped: Arc<AtomicU64>,
}

impl WindowFifo {
    pub fn new(capacity: usize, window_len: usize) -> Self {
        let mut ring = RingBuffer::new();
        ring.prepare(capacity, window_len);
        Self {
            ring: Arc::new(Mutex::new(ring)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reallocates every slot for a new window length and drops anything queued.
    pub fn prepare(&self, window_len: usize) {
        let mut ring = self.lock();
        let capacity = ring.capacity();
        ring.prepare(capacity, window_len);
    }

    /// Producer side. Overwrites the oldest queued window when full.
    pub fn push(&self, window: &AnalysisWindow) {
        let evicted = self.lock().push(window);
        if evicted {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("window fifo full, dropped oldest window ({total} dropped so far)");
        }
    }

    /// Consumer side. Swaps the oldest queued window into `out`.
    pub fn pull_into(&self, out: &mut AnalysisWindow) -> bool {
        self.lock().pull_into(out)
    }

    /// Complete windows waiting to be analysed.
    pub fn available(&self) -> usize {
        self.lock().count()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Windows lost to overflow since creation.
    pub fn dropped_windows(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, RingBuffer<AnalysisWindow>> {
        // Indices move only after the copy completes.
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
