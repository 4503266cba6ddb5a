// src/spectrum/mod.rs

pub mod bands;
pub mod transform;

pub use bands::{BandMapper, BandRange};
pub use transform::{hann_window, SpectrumTransform};
