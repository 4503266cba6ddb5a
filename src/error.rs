// src/error.rs

use thiserror::Error;

/// Configuration problems. Returned before any buffer is allocated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    #[error("window order {0} is out of range (expected 1..=20)")]
    InvalidWindowOrder(u32),

    #[error("sample rate must be a positive finite number, got {0}")]
    InvalidSampleRate(f32),

    #[error("band count must be greater than zero")]
    NoBands,

    #[error("frequency range {min} Hz..{max} Hz is invalid")]
    InvalidFrequencyRange { min: f32, max: f32 },

    #[error("channel count must be greater than zero")]
    NoChannels,

    #[error("fifo capacity must be greater than zero")]
    NoFifoCapacity,

    #[error("failed to read config {path}: {reason}")]
    ConfigFile { path: String, reason: String },
}

/// Reasons an incoming sample block was dropped. These never stop the
/// pipeline; the producer logs them and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("empty sample block")]
    EmptyBlock,

    #[error("channel {channel} is not configured ({configured} channels)")]
    UnknownChannel { channel: usize, configured: usize },

    #[error("interleaved block has zero channels")]
    ZeroChannels,

    #[error("channel {channel} missing from a {present}-channel block")]
    MissingChannel { channel: usize, present: usize },

    #[error("sample block contains non-finite values")]
    NonFinite,
}
