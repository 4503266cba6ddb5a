// src/file_main.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use spectrum_modules::{load_config, AnalyzerConfig, SpectrumPipeline};

/// Irregular block sizes, roughly what a device callback hands over.
const BLOCK_SIZES: [usize; 7] = [441, 512, 3, 1024, 700, 5, 480];

#[derive(Parser, Debug)]
#[command(name = "spectrum_file", about = "Stream a WAV file through the band analyzer")]
struct Cli {
    /// Input WAV file
    input: PathBuf,

    /// TOML config file (sample rate and channels always come from the file)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every published frame as one JSON line
    #[arg(long)]
    json: bool,

    /// Number of logarithmic bands
    #[arg(short, long)]
    bands: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let (samples, sample_rate, channels) = read_wav(&cli.input)?;
    log::info!(
        "{}: {} frames, {} ch @ {} Hz",
        cli.input.display(),
        samples.len() / channels.max(1),
        channels,
        sample_rate
    );

    let mut config = match &cli.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    if let Some(bands) = cli.bands {
        config.band_count = bands;
    }
    config.sample_rate = sample_rate as f32;
    config.channel_count = channels;

    let mut pipeline = SpectrumPipeline::new(&config)?;
    let mut band_totals = vec![0.0_f32; config.band_count];
    let mut frames = 0usize;

    // Whole frames only, cycling through the irregular sizes
    let mut pos = 0;
    for &block_frames in BLOCK_SIZES.iter().cycle() {
        if pos >= samples.len() {
            break;
        }
        let end = (pos + block_frames * channels).min(samples.len());
        pipeline.push_interleaved(&samples[pos..end], channels);
        pos = end;

        if !pipeline.process() {
            continue;
        }
        frames += 1;
        let frame = pipeline.analyzer().latest_frame();
        for (total, band) in band_totals.iter_mut().zip(&frame.bands) {
            *total += band;
        }
        if cli.json {
            println!("{}", serde_json::to_string(&frame)?);
        }
    }

    let analyzer = pipeline.analyzer();
    log::info!(
        "{} frames analysed, {} windows dropped, {} blocks skipped",
        frames,
        analyzer.dropped_windows(),
        analyzer.skipped_blocks()
    );

    let loudest = band_totals
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    if let (Some(band), true) = (loudest, frames > 0) {
        let range = analyzer.band_mapper().ranges()[band];
        log::info!(
            "loudest band on average: #{} ({:.0} Hz .. {:.0} Hz)",
            band,
            range.bin_start_freq,
            range.bin_end_freq
        );
    }
    Ok(())
}

/// Interleaved f32 samples, sample rate, channel count.
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32, usize)> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.sample_rate, spec.channels as usize))
}
