// src/main.rs

use std::fmt::Write as FmtWrite;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, BeginSynchronizedUpdate, Clear, ClearType,
        EndSynchronizedUpdate,
    },
};

use spectrum_modules::capture::InputDevice;
use spectrum_modules::terminal::{render_bars, AutoScale};
use spectrum_modules::{load_config, split, AnalyzerConfig, SpectrumAnalyzer};

/// Bars plus the two status rows must fit a u16 cursor row.
const MAX_HEIGHT: i64 = 500;

#[derive(Parser, Debug)]
#[command(name = "spectrum_live", about = "Live log-band spectrum of the default input device")]
struct Cli {
    /// TOML config file (CLI flags win over file values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window length is 2^order samples
    #[arg(long)]
    window_order: Option<u32>,

    /// Number of logarithmic bands
    #[arg(short, long)]
    bands: Option<usize>,

    /// Lowest band edge in Hz
    #[arg(long)]
    freq_min: Option<f32>,

    /// Highest band edge in Hz
    #[arg(long)]
    freq_max: Option<f32>,

    /// Display refresh rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Bar height in terminal rows
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(2..=MAX_HEIGHT))]
    height: u16,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // 1. Device first: it decides sample rate and channel count
    let device = InputDevice::open_default()?;

    // 2. Config: file < CLI < device
    let mut config = match &cli.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    if let Some(order) = cli.window_order { config.window_order = order; }
    if let Some(bands) = cli.bands { config.band_count = bands; }
    if let Some(fmin) = cli.freq_min { config.freq_min = fmin; }
    if let Some(fmax) = cli.freq_max { config.freq_max = fmax; }
    config.sample_rate = device.sample_rate as f32;
    config.channel_count = device.channels;

    // 3. Pipeline halves: input goes into the callback, analyzer stays here
    let (input, mut analyzer) = split(&config)?;
    let _stream = device.start(input)?;

    enable_raw_mode()?;
    execute!(stdout(), Hide, Clear(ClearType::All))?;

    let result = run_display_loop(&mut analyzer, &cli);

    execute!(stdout(), Show, MoveTo(0, cli.height + 3))?;
    disable_raw_mode()?;
    println!();
    result
}

fn run_display_loop(analyzer: &mut SpectrumAnalyzer, cli: &Cli) -> Result<()> {
    let frame_duration = Duration::from_millis(1000 / cli.fps.max(1) as u64);
    let mut scale = AutoScale::new(0.98);
    let mut draw_buffer = String::with_capacity(8192);
    let mut last_sequence = 0;

    loop {
        if event::poll(frame_duration)? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind == KeyEventKind::Press {
                    let ctrl_c = ev.code == KeyCode::Char('c')
                        && ev.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl_c || matches!(ev.code, KeyCode::Char('q') | KeyCode::Esc) {
                        return Ok(());
                    }
                }
            }
        }

        analyzer.process();
        let frame = analyzer.latest_frame();
        if frame.sequence == last_sequence {
            continue;
        }
        last_sequence = frame.sequence;

        let mut bands = frame.bands;
        scale.apply(&mut bands);
        draw(&mut draw_buffer, analyzer, &bands, cli.height)?;
    }
}

fn draw(buf: &mut String, analyzer: &SpectrumAnalyzer, bands: &[f32], height: u16) -> Result<()> {
    buf.clear();

    for (row, line) in render_bars(bands, height as usize, 2).iter().enumerate() {
        let _ = write!(buf, "{}{}{}", MoveTo(0, row as u16), line, Clear(ClearType::UntilNewLine));
    }

    // Frequency axis: first and last band edges
    let ranges = analyzer.band_mapper().ranges();
    if let (Some(first), Some(last)) = (ranges.first(), ranges.last()) {
        let _ = write!(
            buf,
            "{}{:.0} Hz .. {:.0} Hz{}",
            MoveTo(0, height),
            first.start_freq,
            last.end_freq,
            Clear(ClearType::UntilNewLine)
        );
    }

    let _ = write!(buf, "{}", MoveTo(0, height + 1));
    for (c, level) in analyzer.levels().iter().enumerate() {
        let _ = write!(buf, "ch{} rms {:.3} peak {:.3}  ", c, level.rms, level.peak);
    }
    let _ = write!(
        buf,
        "| dropped {} skipped {} | [Q] quit{}",
        analyzer.dropped_windows(),
        analyzer.skipped_blocks(),
        Clear(ClearType::UntilNewLine)
    );

    let mut out = stdout();
    execute!(out, BeginSynchronizedUpdate)?;
    out.write_all(buf.as_bytes())?;
    execute!(out, EndSynchronizedUpdate)?;
    out.flush()?;
    Ok(())
}
