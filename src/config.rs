// src/config.rs

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

pub const MAX_WINDOW_ORDER: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Hz. Usually whatever the device reports.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f32,
    /// Window length is `2^window_order` samples.
    #[serde(default = "default_window_order")]
    pub window_order: u32,
    #[serde(default = "default_band_count")]
    pub band_count: usize,
    #[serde(default = "default_freq_min")]
    pub freq_min: f32,
    #[serde(default = "default_freq_max")]
    pub freq_max: f32,
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,
    /// Completed windows queued per channel before the oldest is dropped.
    #[serde(default = "default_fifo_capacity")]
    pub fifo_capacity: usize,
    /// Divide the channel-averaged bands by the band count for display.
    #[serde(default = "default_normalize_by_band_count")]
    pub normalize_by_band_count: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            window_order: default_window_order(),
            band_count: default_band_count(),
            freq_min: default_freq_min(),
            freq_max: default_freq_max(),
            channel_count: default_channel_count(),
            fifo_capacity: default_fifo_capacity(),
            normalize_by_band_count: default_normalize_by_band_count(),
        }
    }
}

fn default_sample_rate() -> f32 { 48_000.0 }
fn default_window_order() -> u32 { 10 }
fn default_band_count() -> usize { 24 }
fn default_freq_min() -> f32 { 20.0 }
fn default_freq_max() -> f32 { 20_000.0 }
fn default_channel_count() -> usize { 1 }
fn default_fifo_capacity() -> usize { 50 }
fn default_normalize_by_band_count() -> bool { true }

impl AnalyzerConfig {
    /// Same argument order as the pipeline's `configure` entry point.
    pub fn new(
        window_order: u32,
        sample_rate: f32,
        band_count: usize,
        freq_min: f32,
        freq_max: f32,
    ) -> Self {
        Self {
            sample_rate,
            window_order,
            band_count,
            freq_min,
            freq_max,
            ..Default::default()
        }
    }

    pub fn with_channels(mut self, channel_count: usize) -> Self {
        self.channel_count = channel_count;
        self
    }

    pub fn window_size(&self) -> usize {
        1usize << self.window_order
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate * 0.5
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.window_order == 0 || self.window_order > MAX_WINDOW_ORDER {
            return Err(AnalyzerError::InvalidWindowOrder(self.window_order));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AnalyzerError::InvalidSampleRate(self.sample_rate));
        }
        if self.band_count == 0 {
            return Err(AnalyzerError::NoBands);
        }
        let range_ok = self.freq_min.is_finite()
            && self.freq_max.is_finite()
            && self.freq_min > 0.0
            && self.freq_max > self.freq_min;
        if !range_ok {
            return Err(AnalyzerError::InvalidFrequencyRange {
                min: self.freq_min,
                max: self.freq_max,
            });
        }
        if self.channel_count == 0 {
            return Err(AnalyzerError::NoChannels);
        }
        if self.fifo_capacity == 0 {
            return Err(AnalyzerError::NoFifoCapacity);
        }

        if self.freq_max > self.nyquist() {
            log::warn!(
                "freq_max {:.0} Hz is above Nyquist ({:.0} Hz); upper bands will read mirrored bins",
                self.freq_max,
                self.nyquist()
            );
        }
        Ok(())
    }
}

/// Reads a TOML config. Missing keys fall back to defaults.
pub fn load_config(path: &Path) -> Result<AnalyzerConfig, AnalyzerError> {
    let content = std::fs::read_to_string(path).map_err(|e| AnalyzerError::ConfigFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_config(&content).map_err(|e| match e {
        AnalyzerError::ConfigFile { reason, .. } => AnalyzerError::ConfigFile {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

pub fn parse_config(content: &str) -> Result<AnalyzerConfig, AnalyzerError> {
    let config: AnalyzerConfig = toml::from_str(content).map_err(|e| AnalyzerError::ConfigFile {
        path: "<inline>".into(),
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
