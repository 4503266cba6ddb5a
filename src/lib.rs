// src/lib.rs

pub mod buffer;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod spectrum;
pub mod terminal;

pub use buffer::{AnalysisWindow, RingBuffer, WindowAccumulator, WindowFifo};
pub use config::{load_config, AnalyzerConfig};
pub use engine::{
    split, BandFrame, BandMagnitudes, BandsReader, Channel, ChannelLevel, SampleInput,
    SpectrumAnalyzer, SpectrumPipeline,
};
pub use error::{AnalyzerError, SampleError};
pub use spectrum::{BandMapper, BandRange, SpectrumTransform};
