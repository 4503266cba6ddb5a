// src/buffer/ring.rs

use super::AnalysisWindow;

/// Fixed-capacity circular queue. When full, a push overwrites the oldest
/// unread slot.
///
/// Slots are allocated once by `prepare` and then recycled; `push` copies
/// into the slot with `clone_from` and `pull_into` swaps the slot with the
/// caller's buffer, so neither allocates once slot sizes have settled.
#[derive(Debug)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    read_index: usize,
    write_index: usize,
    full: bool,
}

impl<T: Clone> RingBuffer<T> {
    /// Empty buffer with no slots. Call `prepare_with` before use.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            read_index: 0,
            write_index: 0,
            full: false,
        }
    }

    /// Reallocates `capacity` slots from `make_slot` and resets all indices.
    pub fn prepare_with(&mut self, capacity: usize, mut make_slot: impl FnMut() -> T) {
        self.slots.clear();
        self.slots.extend((0..capacity).map(|_| make_slot()));
        self.clear();
    }

    /// Writes `item` at the write index. Returns `true` if the oldest
    /// unread entry had to be dropped to make room.
    pub fn push(&mut self, item: &T) -> bool {
        let capacity = self.slots.len();
        if capacity == 0 {
            return false;
        }

        self.slots[self.write_index].clone_from(item);

        let evicted = self.full;
        if evicted {
            // Write landed on the oldest unread slot; keep read in front of it.
            self.read_index = (self.read_index + 1) % capacity;
        }

        self.write_index = (self.write_index + 1) % capacity;
        if self.write_index == self.read_index {
            self.full = true;
        }
        evicted
    }

    /// Moves the oldest unread entry into `out` (swapping `out`'s old
    /// contents into the slot). Returns `false` when nothing is unread.
    pub fn pull_into(&mut self, out: &mut T) -> bool {
        if self.is_empty() {
            return false;
        }
        std::mem::swap(out, &mut self.slots[self.read_index]);
        self.read_index = (self.read_index + 1) % self.slots.len();
        self.full = false;
        true
    }

    /// Allocating variant of `pull_into`.
    pub fn pull(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.read_index].clone();
        self.read_index = (self.read_index + 1) % self.slots.len();
        self.full = false;
        Some(item)
    }

    /// Number of unread slots.
    pub fn count(&self) -> usize {
        let capacity = self.slots.len();
        if self.full {
            return capacity;
        }
        if capacity == 0 {
            return 0;
        }
        (self.write_index + capacity - self.read_index) % capacity
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.read_index == self.write_index
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Forgets all unread entries. Slot storage is kept.
    pub fn clear(&mut self) {
        self.read_index = 0;
        self.write_index = 0;
        self.full = false;
    }
}

impl<T: Clone> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBuffer<AnalysisWindow> {
    /// Allocates `capacity` zeroed windows of `window_len` samples.
    pub fn prepare(&mut self, capacity: usize, window_len: usize) {
        self.prepare_with(capacity, || AnalysisWindow::with_len(window_len));
    }
}
