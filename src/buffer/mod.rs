// src/buffer/mod.rs

pub mod accumulator;
pub mod fifo;
pub mod ring;

pub use accumulator::WindowAccumulator;
pub use fifo::WindowFifo;
pub use ring::RingBuffer;

use std::ops::{Deref, DerefMut};

/// One fixed-length block of samples handed to the transform.
#[derive(Debug, Default, PartialEq)]
pub struct AnalysisWindow {
    samples: Vec<f32>,
}

impl AnalysisWindow {
    pub fn with_len(len: usize) -> Self {
        Self { samples: vec![0.0; len] }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

impl From<Vec<f32>> for AnalysisWindow {
    fn from(samples: Vec<f32>) -> Self {
        Self { samples }
    }
}

// Hand-written so ring slots reuse their allocation on copy.
impl Clone for AnalysisWindow {
    fn clone(&self) -> Self {
        Self { samples: self.samples.clone() }
    }

    fn clone_from(&mut self, source: &Self) {
        self.samples.clone_from(&source.samples);
    }
}

impl Deref for AnalysisWindow {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.samples
    }
}

impl DerefMut for AnalysisWindow {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }
}
