// src/engine/latest.rs

use std::sync::{Arc, RwLock};

use serde::Serialize;

/// One published band result. `sequence` goes up by one per publish, so a
/// poller can tell a fresh result from one it has already drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandFrame {
    pub sequence: u64,
    pub bands: Vec<f32>,
}

/// The "latest result" register. Writers replace the whole frame under the
/// lock, so readers never see a mix of two cycles.
pub struct LatestBands {
    frame: RwLock<BandFrame>,
}

impl LatestBands {
    /// All-zero frame with sequence 0.
    pub fn new(band_count: usize) -> Arc<Self> {
        Arc::new(Self {
            frame: RwLock::new(BandFrame {
                sequence: 0,
                bands: vec![0.0; band_count],
            }),
        })
    }

    pub fn publish(&self, bands: &[f32]) {
        let mut frame = match self.frame.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if frame.bands.len() == bands.len() {
            frame.bands.copy_from_slice(bands);
        } else {
            frame.bands = bands.to_vec();
        }
        frame.sequence += 1;
    }

    pub fn snapshot(&self) -> BandFrame {
        match self.frame.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn sequence(&self) -> u64 {
        match self.frame.read() {
            Ok(guard) => guard.sequence,
            Err(poisoned) => poisoned.into_inner().sequence,
        }
    }
}

/// Cheap cloneable read handle for whoever draws the bands.
#[derive(Clone)]
pub struct BandsReader {
    latest: Arc<LatestBands>,
}

impl BandsReader {
    pub fn new(latest: Arc<LatestBands>) -> Self {
        Self { latest }
    }

    pub fn latest_bands(&self) -> Vec<f32> {
        self.latest.snapshot().bands
    }

    pub fn latest_frame(&self) -> BandFrame {
        self.latest.snapshot()
    }

    /// Frame only if something was published after `seen`.
    pub fn frame_after(&self, seen: u64) -> Option<BandFrame> {
        let frame = self.latest.snapshot();
        (frame.sequence > seen).then_some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let latest = LatestBands::new(4);
        let frame = latest.snapshot();
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.bands, vec![0.0; 4]);
    }

    #[test]
    fn publish_replaces_whole_frame() {
        let latest = LatestBands::new(3);
        latest.publish(&[1.0, 2.0, 3.0]);
        latest.publish(&[4.0, 5.0, 6.0]);
        let frame = latest.snapshot();
        assert_eq!(frame.sequence, 2);
        assert_eq!(frame.bands, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn reader_reports_only_new_frames() {
        let latest = LatestBands::new(2);
        let reader = BandsReader::new(latest.clone());
        assert!(reader.frame_after(0).is_none());

        latest.publish(&[0.5, 0.25]);
        let frame = reader.frame_after(0).unwrap();
        assert_eq!(frame.bands, vec![0.5, 0.25]);
        assert!(reader.frame_after(frame.sequence).is_none());
    }

    #[test]
    fn frame_serializes_to_json() {
        let frame = BandFrame { sequence: 7, bands: vec![0.5, 1.0] };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"sequence":7,"bands":[0.5,1.0]}"#);
    }
}
