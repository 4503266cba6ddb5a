// src/engine/mod.rs

pub mod channel;
pub mod latest;
pub mod metering;

pub use channel::ChannelProcessor;
pub use latest::{BandFrame, BandsReader, LatestBands};
pub use metering::{ChannelLevel, LevelMeters};

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::buffer::{WindowAccumulator, WindowFifo};
use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, SampleError};
use crate::spectrum::{BandMapper, SpectrumTransform};

/// One averaged magnitude per logarithmic band, lowest band first.
pub type BandMagnitudes = Vec<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left = 0,
    Right = 1,
}

impl Channel {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Builds both halves of a pipeline from a validated config.
///
/// `SampleInput` goes to the audio callback, `SpectrumAnalyzer` to whatever
/// polls for display. They only share the per-channel window fifos, the
/// skip counter and the read-only result handles.
pub fn split(config: &AnalyzerConfig) -> Result<(SampleInput, SpectrumAnalyzer), AnalyzerError> {
    config.validate()?;

    let window_len = config.window_size();
    let skipped_blocks = Arc::new(AtomicU64::new(0));

    let mut accumulators = Vec::with_capacity(config.channel_count);
    let mut channels = Vec::with_capacity(config.channel_count);
    for index in 0..config.channel_count {
        let fifo = WindowFifo::new(config.fifo_capacity, window_len);
        let mut acc = WindowAccumulator::new(fifo.clone());
        acc.prepare(window_len);
        accumulators.push(acc);
        channels.push(ChannelProcessor::new(index, fifo, window_len, config.band_count));
    }

    let mapper = BandMapper::new(
        config.band_count,
        config.freq_min,
        config.freq_max,
        config.sample_rate,
        window_len,
    );

    log::info!(
        "spectrum pipeline: {} ch @ {} Hz, window {} samples, {} bands over {}..{} Hz",
        config.channel_count,
        config.sample_rate,
        window_len,
        config.band_count,
        config.freq_min,
        config.freq_max
    );

    let input = SampleInput {
        accumulators,
        skipped_blocks: skipped_blocks.clone(),
    };
    let analyzer = SpectrumAnalyzer {
        config: config.clone(),
        channels,
        transform: SpectrumTransform::new(window_len),
        mapper,
        sums: vec![0.0; config.band_count],
        latest: LatestBands::new(config.band_count),
        meters: LevelMeters::new(config.channel_count),
        skipped_blocks,
        cycles: 0,
    };
    Ok((input, analyzer))
}

// ==========================================
// Producer half
// ==========================================

/// Producer half. Owned by the audio callback; never blocks on analysis work.
pub struct SampleInput {
    accumulators: Vec<WindowAccumulator>,
    skipped_blocks: Arc<AtomicU64>,
}

impl SampleInput {
    pub fn channel_count(&self) -> usize {
        self.accumulators.len()
    }

    /// Feeds one channel. Bad blocks are logged and dropped without
    /// touching any window state.
    pub fn push_samples(&mut self, channel: usize, samples: &[f32]) {
        if let Err(err) = self.try_push_samples(channel, samples) {
            self.skip(err);
        }
    }

    pub fn push_channel(&mut self, channel: Channel, samples: &[f32]) {
        self.push_samples(channel.index(), samples);
    }

    /// Like `push_samples` but hands the reject reason back instead of
    /// logging it. Returns the number of windows completed.
    pub fn try_push_samples(&mut self, channel: usize, samples: &[f32]) -> Result<usize, SampleError> {
        if samples.is_empty() {
            return Err(SampleError::EmptyBlock);
        }
        let configured = self.accumulators.len();
        let acc = self
            .accumulators
            .get_mut(channel)
            .ok_or(SampleError::UnknownChannel { channel, configured })?;
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(SampleError::NonFinite);
        }
        Ok(acc.update(samples))
    }

    /// Feeds every configured channel from one interleaved device block.
    /// A trailing partial frame is ignored, as are device channels beyond
    /// the configured count. Returns the number of windows completed.
    pub fn push_interleaved(&mut self, samples: &[f32], channels: usize) -> usize {
        match self.try_push_interleaved(samples, channels) {
            Ok(completed) => completed,
            Err(err) => {
                self.skip(err);
                0
            }
        }
    }

    fn try_push_interleaved(&mut self, samples: &[f32], channels: usize) -> Result<usize, SampleError> {
        if channels == 0 {
            return Err(SampleError::ZeroChannels);
        }
        let frames = samples.len() / channels;
        if frames == 0 {
            return Err(SampleError::EmptyBlock);
        }
        let whole = &samples[..frames * channels];
        if whole.iter().any(|s| !s.is_finite()) {
            return Err(SampleError::NonFinite);
        }

        let mut completed = 0;
        let mut missing = None;
        for (c, acc) in self.accumulators.iter_mut().enumerate() {
            if c >= channels {
                missing.get_or_insert(c);
                continue;
            }
            completed += acc.update_from(whole.iter().skip(c).step_by(channels).copied());
        }

        if let Some(channel) = missing {
            // Channels that were present still got their samples.
            self.skip(SampleError::MissingChannel { channel, present: channels });
        }
        Ok(completed)
    }

    /// Complete windows queued for `channel`, not yet analysed.
    pub fn available_windows(&self, channel: usize) -> usize {
        self.accumulators
            .get(channel)
            .map_or(0, WindowAccumulator::available_windows)
    }

    pub fn skipped_blocks(&self) -> u64 {
        self.skipped_blocks.load(Ordering::Relaxed)
    }

    fn skip(&self, err: SampleError) {
        self.skipped_blocks.fetch_add(1, Ordering::Relaxed);
        match err {
            SampleError::EmptyBlock => log::debug!("skipping sample block: {err}"),
            _ => log::warn!("skipping sample block: {err}"),
        }
    }
}

// ==========================================
// Consumer half
// ==========================================

/// Consumer half and orchestrator: drains every channel, transforms, maps to
/// bands, averages across channels and publishes the result.
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    channels: Vec<ChannelProcessor>,
    transform: SpectrumTransform,
    mapper: BandMapper,
    sums: Vec<f32>,
    latest: Arc<LatestBands>,
    meters: Arc<LevelMeters>,
    skipped_blocks: Arc<AtomicU64>,
    cycles: u64,
}

impl SpectrumAnalyzer {
    /// Runs one analysis cycle. Returns `true` if a new result was published;
    /// with no new window on any channel the previous result stays in place.
    ///
    /// A channel without a new window still contributes its newest bands, so
    /// the result does not depend on how polls interleave with pushes.
    pub fn process(&mut self) -> bool {
        // 1. Drain every channel; only fresh channels update their meters
        let mut fresh = 0usize;
        for channel in &mut self.channels {
            if channel.drain(&mut self.transform, &self.mapper) > 0 {
                fresh += 1;
                self.meters.store(channel.index(), channel.level());
            }
        }
        if fresh == 0 {
            return false;
        }

        // 2. Average over every channel that has produced a result so far
        self.sums.fill(0.0);
        let mut contributing = 0usize;
        for channel in self.channels.iter().filter(|c| c.has_result()) {
            contributing += 1;
            for (sum, &band) in self.sums.iter_mut().zip(channel.bands()) {
                *sum += band;
            }
        }
        let channel_scale = 1.0 / contributing as f32;
        // 3. Display-range scaling
        let band_scale = if self.config.normalize_by_band_count {
            1.0 / self.config.band_count as f32
        } else {
            1.0
        };
        let scale = channel_scale * band_scale;
        for sum in &mut self.sums {
            *sum *= scale;
        }

        self.latest.publish(&self.sums);
        self.cycles += 1;
        log::trace!(
            "analysis cycle {}: {} fresh of {} channel(s)",
            self.cycles,
            fresh,
            contributing
        );
        true
    }

    /// Most recent published bands, all zero before the first window.
    pub fn latest_bands(&self) -> BandMagnitudes {
        self.latest.snapshot().bands
    }

    pub fn latest_frame(&self) -> BandFrame {
        self.latest.snapshot()
    }

    /// Read handle for another thread.
    pub fn reader(&self) -> BandsReader {
        BandsReader::new(self.latest.clone())
    }

    /// RMS and peak of the newest analysed window per channel.
    pub fn levels(&self) -> Vec<ChannelLevel> {
        self.meters.snapshot()
    }

    pub fn meters(&self) -> Arc<LevelMeters> {
        self.meters.clone()
    }

    /// Magnitude spectrum of the newest window analysed on `channel`.
    pub fn spectrum(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(ChannelProcessor::magnitudes)
    }

    pub fn band_mapper(&self) -> &BandMapper {
        &self.mapper
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn pending_windows(&self) -> usize {
        self.channels.iter().map(ChannelProcessor::pending_windows).sum()
    }

    /// Windows lost to fifo overflow, all channels.
    pub fn dropped_windows(&self) -> u64 {
        self.channels.iter().map(ChannelProcessor::dropped_windows).sum()
    }

    /// Input blocks rejected by the producer.
    pub fn skipped_blocks(&self) -> u64 {
        self.skipped_blocks.load(Ordering::Relaxed)
    }
}

// ==========================================
// Single-owner facade
// ==========================================

/// Both halves behind one value, for callers that push and read on the
/// same thread (or wrap the whole thing in their own lock).
pub struct SpectrumPipeline {
    input: SampleInput,
    analyzer: SpectrumAnalyzer,
}

impl SpectrumPipeline {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let (input, analyzer) = split(config)?;
        Ok(Self { input, analyzer })
    }

    /// Rebuilds every buffer for `config`. Queued windows and the previous
    /// result are discarded. On error the current setup is left untouched.
    pub fn configure(&mut self, config: &AnalyzerConfig) -> Result<(), AnalyzerError> {
        let (input, analyzer) = split(config)?;
        self.input = input;
        self.analyzer = analyzer;
        Ok(())
    }

    pub fn push_samples(&mut self, channel: usize, samples: &[f32]) {
        self.input.push_samples(channel, samples);
    }

    pub fn push_interleaved(&mut self, samples: &[f32], channels: usize) -> usize {
        self.input.push_interleaved(samples, channels)
    }

    pub fn process(&mut self) -> bool {
        self.analyzer.process()
    }

    /// Runs a cycle, then returns the latest bands.
    pub fn poll_bands(&mut self) -> BandMagnitudes {
        self.analyzer.process();
        self.analyzer.latest_bands()
    }

    pub fn latest_bands(&self) -> BandMagnitudes {
        self.analyzer.latest_bands()
    }

    pub fn input(&self) -> &SampleInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut SampleInput {
        &mut self.input
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut SpectrumAnalyzer {
        &mut self.analyzer
    }

    pub fn into_parts(self) -> (SampleInput, SpectrumAnalyzer) {
        (self.input, self.analyzer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_config(channels: usize) -> AnalyzerConfig {
        AnalyzerConfig {
            window_order: 4,
            band_count: 4,
            freq_min: 1_000.0,
            freq_max: 20_000.0,
            ..AnalyzerConfig::default()
        }
        .with_channels(channels)
    }

    #[test]
    fn split_rejects_invalid_config() {
        let cfg = AnalyzerConfig { band_count: 0, ..AnalyzerConfig::default() };
        assert!(matches!(split(&cfg), Err(AnalyzerError::NoBands)));
    }

    #[test]
    fn try_push_reports_reject_reasons() {
        let (mut input, _analyzer) = split(&small_config(1)).unwrap();
        assert_eq!(input.try_push_samples(0, &[]), Err(SampleError::EmptyBlock));
        assert_eq!(
            input.try_push_samples(3, &[0.0]),
            Err(SampleError::UnknownChannel { channel: 3, configured: 1 })
        );
        assert_eq!(input.try_push_samples(0, &[0.0, f32::NAN]), Err(SampleError::NonFinite));
        assert_eq!(input.try_push_samples(0, &[0.0; 16]), Ok(1));
    }

    #[test]
    fn zero_channel_interleaved_block_is_skipped() {
        let (mut input, _analyzer) = split(&small_config(2)).unwrap();
        assert_eq!(input.try_push_interleaved(&[0.1; 8], 0), Err(SampleError::ZeroChannels));

        assert_eq!(input.push_interleaved(&[0.1; 8], 0), 0);
        assert_eq!(input.skipped_blocks(), 1);
        assert_eq!(input.available_windows(0), 0);
        assert_eq!(input.available_windows(1), 0);
    }

    #[test]
    fn skipped_blocks_do_not_disturb_windows() {
        let (mut input, analyzer) = split(&small_config(1)).unwrap();
        input.push_samples(0, &[0.1; 10]);
        input.push_samples(0, &[f32::INFINITY; 10]);
        input.push_samples(7, &[0.1; 10]);
        input.push_samples(0, &[0.1; 6]);
        assert_eq!(input.available_windows(0), 1);
        assert_eq!(analyzer.skipped_blocks(), 2);
    }

    #[test]
    fn process_without_windows_keeps_previous_result() {
        let (_input, mut analyzer) = split(&small_config(1)).unwrap();
        assert!(!analyzer.process());
        assert_eq!(analyzer.latest_bands(), vec![0.0; 4]);
        assert_eq!(analyzer.latest_frame().sequence, 0);
    }

    #[test]
    fn averages_over_contributing_channels() {
        let cfg = AnalyzerConfig { normalize_by_band_count: false, ..small_config(2) };
        let tone: Vec<f32> = (0..16).map(|n| (n as f32 * 0.9).sin()).collect();

        // same signal on both channels -> same as one channel alone
        let (mut input, mut analyzer) = split(&cfg).unwrap();
        input.push_samples(0, &tone);
        input.push_samples(1, &tone);
        assert!(analyzer.process());
        let both = analyzer.latest_bands();

        // channel 1 has never produced a window -> divisor is 1, not 2
        let (mut input, mut analyzer) = split(&cfg).unwrap();
        input.push_samples(0, &tone);
        assert!(analyzer.process());
        let single = analyzer.latest_bands();

        for (a, b) in both.iter().zip(&single) {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn result_does_not_depend_on_poll_timing() {
        let cfg = AnalyzerConfig::default().with_channels(2);
        let tone: Vec<f32> = (0..1024)
            .map(|n| 0.5 * (2.0 * std::f32::consts::PI * 1000.0 * n as f32 / 48_000.0).sin())
            .collect();
        let silence = vec![0.0; 1024];

        let (mut input, mut analyzer) = split(&cfg).unwrap();
        input.push_channel(Channel::Left, &tone);
        input.push_channel(Channel::Right, &silence);
        assert!(analyzer.process());
        let together = analyzer.latest_bands();

        let (mut input, mut analyzer) = split(&cfg).unwrap();
        input.push_channel(Channel::Left, &tone);
        assert!(analyzer.process());
        input.push_channel(Channel::Right, &silence);
        assert!(analyzer.process());
        let staggered = analyzer.latest_bands();

        assert!(together[13] > 0.0);
        for (a, b) in together.iter().zip(&staggered) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }

        // nothing new on either channel: no publish
        assert!(!analyzer.process());
        assert_eq!(analyzer.latest_frame().sequence, 2);
    }

    #[test]
    fn band_count_normalisation_scales_result() {
        let tone: Vec<f32> = (0..16).map(|n| (n as f32 * 0.9).sin()).collect();

        let mut raw = SpectrumPipeline::new(&AnalyzerConfig {
            normalize_by_band_count: false,
            ..small_config(1)
        })
        .unwrap();
        raw.push_samples(0, &tone);
        let raw_bands = raw.poll_bands();

        let mut scaled = SpectrumPipeline::new(&small_config(1)).unwrap();
        scaled.push_samples(0, &tone);
        let scaled_bands = scaled.poll_bands();

        for (r, s) in raw_bands.iter().zip(&scaled_bands) {
            assert_relative_eq!(r / 4.0, *s, epsilon = 1e-6);
        }
    }

    #[test]
    fn interleaved_block_feeds_each_channel() {
        let (mut input, mut analyzer) = split(&small_config(2)).unwrap();
        // left constant 0.5, right silent; 16 frames plus a dangling sample
        let mut block: Vec<f32> = (0..32).map(|i| if i % 2 == 0 { 0.5 } else { 0.0 }).collect();
        block.push(0.9);
        assert_eq!(input.push_interleaved(&block, 2), 2);

        assert!(analyzer.process());
        let levels = analyzer.levels();
        assert_relative_eq!(levels[0].peak, 0.5);
        assert_eq!(levels[1], ChannelLevel::default());
    }

    #[test]
    fn mono_device_on_stereo_pipeline_feeds_left_only() {
        let (mut input, _analyzer) = split(&small_config(2)).unwrap();
        assert_eq!(input.push_interleaved(&[0.2; 16], 1), 1);
        assert_eq!(input.available_windows(0), 1);
        assert_eq!(input.available_windows(1), 0);
        assert_eq!(input.skipped_blocks(), 1);
    }

    #[test]
    fn configure_resets_state_and_keeps_old_on_error() {
        let mut pipeline = SpectrumPipeline::new(&small_config(1)).unwrap();
        pipeline.push_samples(0, &[0.3; 16]);
        pipeline.process();
        assert_eq!(pipeline.analyzer().latest_frame().sequence, 1);

        let bad = AnalyzerConfig { window_order: 0, ..small_config(1) };
        assert!(pipeline.configure(&bad).is_err());
        assert_eq!(pipeline.analyzer().latest_frame().sequence, 1);

        let bigger = AnalyzerConfig { window_order: 5, band_count: 6, ..small_config(1) };
        pipeline.configure(&bigger).unwrap();
        assert_eq!(pipeline.latest_bands(), vec![0.0; 6]);
        pipeline.push_samples(0, &[0.3; 16]);
        assert_eq!(pipeline.input().available_windows(0), 0);
        pipeline.push_samples(0, &[0.3; 16]);
        assert_eq!(pipeline.input().available_windows(0), 1);
    }

    #[test]
    fn channel_enum_maps_to_index() {
        assert_eq!(Channel::Left.index(), 0);
        assert_eq!(Channel::Right.index(), 1);
    }
}
