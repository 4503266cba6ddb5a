// src/spectrum/bands.rs

use serde::Serialize;

/// One display band. Bins are half-open: `start_bin..end_bin`.
///
/// `start_freq`/`end_freq` are the nominal log-spaced edges. Low bands that
/// borrow bins sit well above those, so `bin_start_freq`/`bin_end_freq`
/// give what the band actually measures: the frequencies whose nearest bin
/// falls in `start_bin..end_bin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandRange {
    pub start_freq: f32,
    pub end_freq: f32,
    pub start_bin: usize,
    pub end_bin: usize,
    pub bin_start_freq: f32,
    pub bin_end_freq: f32,
}

impl BandRange {
    pub fn bin_count(&self) -> usize {
        self.end_bin.saturating_sub(self.start_bin)
    }

    /// Whether a tone at `hz` peaks in one of this band's bins.
    pub fn contains_freq(&self, hz: f32) -> bool {
        hz >= self.bin_start_freq && hz < self.bin_end_freq
    }
}

/// Maps a linear magnitude spectrum onto logarithmically spaced bands, so
/// that every band spans the same pitch ratio.
#[derive(Debug, Clone)]
pub struct BandMapper {
    ranges: Vec<BandRange>,
    spectrum_len: usize,
    bin_width: f32,
}

impl BandMapper {
    /// Precomputes the bin range of each band.
    ///
    /// Band `b` nominally covers
    /// `10^(b/N · (log10 fmax − log10 fmin) + log10 fmin)` up to the same
    /// expression at `b + 1`, converted to bins with
    /// `floor(freq / sample_rate · spectrum_len)`.
    ///
    /// Low bands are usually narrower than a bin. Those borrow the next
    /// unused bin, so every band covers at least one bin and both edges
    /// increase strictly with the band index (until the spectrum runs out).
    pub fn new(
        band_count: usize,
        freq_min: f32,
        freq_max: f32,
        sample_rate: f32,
        spectrum_len: usize,
    ) -> Self {
        let log_min = (freq_min as f64).log10();
        let log_span = (freq_max as f64).log10() - log_min;
        let to_freq = |b: usize| 10f64.powf(b as f64 / band_count as f64 * log_span + log_min);
        let to_bin = |hz: f64| {
            let bin = (hz / sample_rate as f64 * spectrum_len as f64).floor();
            // clamp into [0, spectrum_len]
            bin.max(0.0).min(spectrum_len as f64) as usize
        };

        let bin_width = sample_rate as f64 / spectrum_len as f64;
        // bin k collects tones within half a bin of k · bin_width
        let bin_edge = |bin: usize| ((bin as f64 - 0.5).max(0.0) * bin_width) as f32;

        let mut ranges = Vec::with_capacity(band_count);
        let mut prev_end = 0;
        for b in 0..band_count {
            let start_freq = to_freq(b);
            let end_freq = to_freq(b + 1);

            let start_bin = to_bin(start_freq).max(prev_end).min(spectrum_len);
            let end_bin = to_bin(end_freq).max(start_bin + 1).min(spectrum_len);

            ranges.push(BandRange {
                start_freq: start_freq as f32,
                end_freq: end_freq as f32,
                start_bin,
                end_bin,
                bin_start_freq: bin_edge(start_bin),
                bin_end_freq: if end_bin > start_bin { bin_edge(end_bin) } else { bin_edge(start_bin) },
            });
            prev_end = end_bin;
        }

        Self {
            ranges,
            spectrum_len,
            bin_width: bin_width as f32,
        }
    }

    pub fn band_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn spectrum_len(&self) -> usize {
        self.spectrum_len
    }

    pub fn ranges(&self) -> &[BandRange] {
        &self.ranges
    }

    /// Index of the band that averages the bin nearest to `hz`, i.e. where
    /// a pure tone at `hz` shows up. `None` past the last band's bins.
    pub fn band_for_frequency(&self, hz: f32) -> Option<usize> {
        if !hz.is_finite() || hz < 0.0 {
            return None;
        }
        let bin = (hz / self.bin_width).round() as usize;
        self.ranges
            .iter()
            .position(|r| r.start_bin <= bin && bin < r.end_bin)
    }

    /// Mean magnitude per band. Bins outside `magnitudes` are ignored; a band
    /// left with no bins reads zero.
    pub fn map(&self, magnitudes: &[f32], bands: &mut [f32]) {
        debug_assert_eq!(bands.len(), self.ranges.len());
        let len = magnitudes.len();

        for (value, range) in bands.iter_mut().zip(&self.ranges) {
            let start = range.start_bin.min(len);
            let end = range.end_bin.min(len);
            *value = if end > start {
                let bins = &magnitudes[start..end];
                bins.iter().sum::<f32>() / bins.len() as f32
            } else {
                0.0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_mapper() -> BandMapper {
        BandMapper::new(24, 20.0, 20_000.0, 48_000.0, 1024)
    }

    #[test]
    fn boundaries_increase_strictly() {
        let mapper = default_mapper();
        let ranges = mapper.ranges();
        assert_eq!(ranges.len(), 24);
        for pair in ranges.windows(2) {
            assert!(pair[1].start_bin > pair[0].start_bin);
            assert!(pair[1].end_bin > pair[0].end_bin);
            assert!(pair[1].start_bin >= pair[0].end_bin);
        }
        assert!(ranges.iter().all(|r| r.bin_count() >= 1));
    }

    #[test]
    fn upper_bands_follow_log_formula() {
        let ranges = default_mapper().ranges().to_vec();
        // 843.4 Hz .. 1124.7 Hz at 46.875 Hz per bin
        assert_eq!((ranges[13].start_bin, ranges[13].end_bin), (17, 23));
        // 14997.9 Hz .. 20000 Hz
        assert_eq!((ranges[23].start_bin, ranges[23].end_bin), (319, 426));
        assert!((ranges[0].start_freq - 20.0).abs() < 1e-3);
        assert!((ranges[23].end_freq - 20_000.0).abs() < 0.5);
    }

    #[test]
    fn low_bands_borrow_one_bin_each() {
        let ranges = default_mapper().ranges().to_vec();
        let low: Vec<(usize, usize)> = ranges[..4].iter().map(|r| (r.start_bin, r.end_bin)).collect();
        assert_eq!(low, vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn band_value_is_mean_of_its_bins() {
        let mapper = default_mapper();
        let mags: Vec<f32> = (0..1024).map(|i| i as f32).collect();
        let mut bands = vec![0.0; 24];
        mapper.map(&mags, &mut bands);

        // bins 17..23 -> mean of 17..=22
        assert!((bands[13] - 19.5).abs() < 1e-4);
        assert_eq!(bands[0], 0.0);
        assert_eq!(bands[1], 1.0);
    }

    #[test]
    fn short_spectrum_is_clamped() {
        let mapper = default_mapper();
        let mags = vec![1.0; 100];
        let mut bands = vec![-1.0; 24];
        mapper.map(&mags, &mut bands);
        assert_eq!(bands[18], 1.0); // 75..101 is cut to 75..100
        assert_eq!(bands[19], 0.0); // 101..134 starts past the end
        assert_eq!(bands[23], 0.0);
    }

    #[test]
    fn bins_never_exceed_spectrum() {
        // more bands than usable bins
        let mapper = BandMapper::new(64, 20.0, 20_000.0, 48_000.0, 16);
        for r in mapper.ranges() {
            assert!(r.start_bin <= 16 && r.end_bin <= 16);
        }
    }

    #[test]
    fn finds_band_for_frequency() {
        let mapper = default_mapper();
        assert_eq!(mapper.band_for_frequency(1000.0), Some(13));
        assert_eq!(mapper.band_for_frequency(21.0), Some(0));
        assert_eq!(mapper.band_for_frequency(10.0), Some(0));
        assert_eq!(mapper.band_for_frequency(25_000.0), None);
        assert_eq!(mapper.band_for_frequency(-5.0), None);
    }

    #[test]
    fn borrowed_bands_report_the_frequencies_they_measure() {
        let mapper = default_mapper();
        let band5 = mapper.ranges()[5];
        // nominally 84.3 Hz .. 112.5 Hz, but it averages bin 5 alone
        assert_eq!((band5.start_bin, band5.end_bin), (5, 6));
        assert!((band5.bin_start_freq - 4.5 * 46.875).abs() < 1e-2);
        assert!((band5.bin_end_freq - 5.5 * 46.875).abs() < 1e-2);

        assert_eq!(mapper.band_for_frequency(230.0), Some(5));
        assert!(band5.contains_freq(230.0));
        assert!(!mapper.ranges()[8].contains_freq(230.0));
    }

    #[test]
    fn measured_edges_tile_without_gaps() {
        let mapper = default_mapper();
        let ranges = mapper.ranges();
        assert_eq!(ranges[0].bin_start_freq, 0.0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].bin_end_freq, pair[1].bin_start_freq);
        }
    }
}
