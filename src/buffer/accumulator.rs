// src/buffer/accumulator.rs

use super::{AnalysisWindow, WindowFifo};

/// Re-chunks arbitrarily sized sample blocks for one channel into
/// fixed-length windows and queues each completed window in its fifo.
///
/// The partially filled window is reused for the next one, so nothing is
/// allocated per sample or per block after `prepare`.
pub struct WindowAccumulator {
    fifo: WindowFifo,
    window: AnalysisWindow,
    cursor: usize,
    prepared: bool,
}

impl WindowAccumulator {
    pub fn new(fifo: WindowFifo) -> Self {
        Self {
            fifo,
            window: AnalysisWindow::default(),
            cursor: 0,
            prepared: false,
        }
    }

    /// Sizes the working window and the fifo slots.
    ///
    /// # Panics
    /// If `window_size` is not a power of two >= 2.
    pub fn prepare(&mut self, window_size: usize) {
        assert!(
            window_size >= 2 && window_size.is_power_of_two(),
            "window size {window_size} must be a power of two >= 2"
        );
        self.prepared = false;
        self.window = AnalysisWindow::with_len(window_size);
        self.fifo.prepare(window_size);
        self.cursor = 0;
        self.prepared = true;
    }

    /// Appends `samples`, queuing a window every time one fills up.
    /// Returns the number of windows completed by this call.
    pub fn update(&mut self, samples: &[f32]) -> usize {
        self.update_from(samples.iter().copied())
    }

    /// Same as `update`, for samples that are not contiguous in memory
    /// (e.g. one channel of an interleaved block).
    pub fn update_from(&mut self, samples: impl IntoIterator<Item = f32>) -> usize {
        if !self.prepared {
            log::warn!("sample block pushed before prepare(); ignoring");
            return 0;
        }

        let size = self.window.len();
        let mut completed = 0;
        for sample in samples {
            self.window[self.cursor] = sample;
            self.cursor += 1;

            if self.cursor == size {
                self.fifo.push(&self.window);
                self.cursor = 0;
                completed += 1;
            }
        }
        completed
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Samples sitting in the current, incomplete window.
    pub fn fill_level(&self) -> usize {
        self.cursor
    }

    /// Complete windows queued and not yet pulled by the consumer.
    pub fn available_windows(&self) -> usize {
        self.fifo.available()
    }

    pub fn fifo(&self) -> &WindowFifo {
        &self.fifo
    }
}
