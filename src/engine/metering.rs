// src/engine/metering.rs

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelLevel {
    pub rms: f32,
    pub peak: f32,
}

impl ChannelLevel {
    /// Level of one analysis window.
    pub fn measure(window: &[f32]) -> Self {
        if window.is_empty() {
            return Self::default();
        }
        let mut peak = 0.0_f32;
        let mut sum_sq = 0.0_f32;
        for &s in window {
            peak = peak.max(s.abs());
            sum_sq += s * s;
        }
        Self {
            rms: (sum_sq / window.len() as f32).sqrt(),
            peak,
        }
    }
}

/// Lock-free per-channel level readout. The analysis side writes, any
/// thread reads. Values are stored as f32 bits.
pub struct LevelMeters {
    rms: Vec<AtomicU32>,
    peak: Vec<AtomicU32>,
}

impl LevelMeters {
    pub fn new(channels: usize) -> Arc<Self> {
        Arc::new(Self {
            rms: (0..channels).map(|_| AtomicU32::new(0)).collect(),
            peak: (0..channels).map(|_| AtomicU32::new(0)).collect(),
        })
    }

    pub fn channels(&self) -> usize {
        self.rms.len()
    }

    pub fn store(&self, channel: usize, level: ChannelLevel) {
        if let (Some(rms), Some(peak)) = (self.rms.get(channel), self.peak.get(channel)) {
            rms.store(level.rms.to_bits(), Ordering::Relaxed);
            peak.store(level.peak.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn load(&self, channel: usize) -> Option<ChannelLevel> {
        let rms = self.rms.get(channel)?.load(Ordering::Relaxed);
        let peak = self.peak.get(channel)?.load(Ordering::Relaxed);
        Some(ChannelLevel {
            rms: f32::from_bits(rms),
            peak: f32::from_bits(peak),
        })
    }

    pub fn snapshot(&self) -> Vec<ChannelLevel> {
        (0..self.channels()).filter_map(|c| self.load(c)).collect()
    }
}
