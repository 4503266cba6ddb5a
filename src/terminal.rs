// src/terminal.rs

/// Vertical bar chart, one column group per band, rows top to bottom.
/// `levels` are expected in 0.0..=1.0 and are clamped.
pub fn render_bars(levels: &[f32], height: usize, bar_width: usize) -> Vec<String> {
    let h = height.max(2);
    let w = bar_width.max(1);
    let filled: Vec<usize> = levels
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * h as f32).round() as usize)
        .collect();

    (0..h)
        .map(|row| {
            let level_from_bottom = h - row;
            let mut line = String::with_capacity(levels.len() * (w + 1) * 3);
            for &rows in &filled {
                let ch = if rows >= level_from_bottom { '█' } else { ' ' };
                line.extend(std::iter::repeat_n(ch, w));
                line.push(' ');
            }
            line
        })
        .collect()
}

/// Tracks a slowly decaying peak so bars use the full height whatever the
/// input level.
pub struct AutoScale {
    peak: f32,
    decay: f32,
    floor: f32,
}

impl AutoScale {
    pub fn new(decay: f32) -> Self {
        Self { peak: 0.0, decay, floor: 1e-6 }
    }

    /// Rescales `bands` in place into 0.0..=1.0.
    pub fn apply(&mut self, bands: &mut [f32]) {
        let current = bands.iter().copied().fold(0.0_f32, f32::max);
        self.peak = (self.peak * self.decay).max(current).max(self.floor);
        for b in bands.iter_mut() {
            *b /= self.peak;
        }
    }
}
