// src/engine/channel.rs

use crate::buffer::{AnalysisWindow, WindowFifo};
use crate::spectrum::{BandMapper, SpectrumTransform};

use super::metering::ChannelLevel;

/// Consumer-side state for one input channel: pulls completed windows from
/// the channel's fifo and turns the newest one into band values.
pub struct ChannelProcessor {
    index: usize,
    fifo: WindowFifo,
    window: AnalysisWindow,
    magnitudes: Vec<f32>,
    bands: Vec<f32>,
    level: ChannelLevel,
    has_result: bool,
}

impl ChannelProcessor {
    pub fn new(index: usize, fifo: WindowFifo, window_len: usize, band_count: usize) -> Self {
        Self {
            index,
            fifo,
            window: AnalysisWindow::with_len(window_len),
            magnitudes: vec![0.0; window_len],
            bands: vec![0.0; band_count],
            level: ChannelLevel::default(),
            has_result: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Processes every ready window in order. Each result overwrites the
    /// previous one, so afterwards `bands()` holds the newest window's
    /// values. Returns how many windows were processed.
    pub fn drain(&mut self, transform: &mut SpectrumTransform, mapper: &BandMapper) -> usize {
        let mut processed = 0;
        while self.fifo.pull_into(&mut self.window) {
            debug_assert_eq!(
                self.window.len(),
                transform.len(),
                "channel {}: window length does not match the transform",
                self.index
            );
            transform.process(&self.window, &mut self.magnitudes);
            mapper.map(&self.magnitudes, &mut self.bands);
            self.level = ChannelLevel::measure(&self.window);
            processed += 1;
        }
        if processed > 0 {
            self.has_result = true;
            log::trace!("channel {}: {} window(s) analysed", self.index, processed);
        }
        processed
    }

    /// Whether any window has been analysed since creation.
    pub fn has_result(&self) -> bool {
        self.has_result
    }

    pub fn bands(&self) -> &[f32] {
        &self.bands
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn level(&self) -> ChannelLevel {
        self.level
    }

    pub fn pending_windows(&self) -> usize {
        self.fifo.available()
    }

    pub fn dropped_windows(&self) -> u64 {
        self.fifo.dropped_windows()
    }
}
