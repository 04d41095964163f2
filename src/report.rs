use log::info;

use crate::clients::entities::PlaylistHandle;

/// Outcome of a playlist transfer.
///
/// Every source track ends up in exactly one of `matched`, `unmatched` or
/// `errored`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub playlist_name: String,
    pub destination: PlaylistHandle,
    pub total_tracks: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub errored: usize,
    pub unmatched_tracks: Vec<String>,
}

impl TransferReport {
    /// Empty report for a freshly created destination playlist
    pub fn new(playlist_name: String, destination: PlaylistHandle, total_tracks: usize) -> Self {
        TransferReport {
            playlist_name,
            destination,
            total_tracks,
            matched: 0,
            unmatched: 0,
            errored: 0,
            unmatched_tracks: Vec::new(),
        }
    }

    pub(crate) fn record_unmatched(&mut self, label: String) {
        self.unmatched += 1;
        self.unmatched_tracks.push(label);
    }

    pub(crate) fn record_batch(&mut self, size: usize, appended: bool) {
        if appended {
            self.matched += size;
        } else {
            self.errored += size;
        }
    }

    /// Percentage of source tracks added to the destination, 0 for an empty playlist
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_tracks == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total_tracks as f64 * 100.0
    }

    /// True when the counters account for every source track
    pub fn is_complete(&self) -> bool {
        self.matched + self.unmatched + self.errored == self.total_tracks
    }

    /// Log the end of run summary
    pub fn log_summary(&self) {
        info!("Transfer summary for '{}':", self.playlist_name);
        info!("  Total tracks: {}", self.total_tracks);
        info!("  Added: {}", self.matched);
        info!("  Not found on destination: {}", self.unmatched);
        info!("  Errors: {}", self.errored);
        if !self.unmatched_tracks.is_empty() {
            info!("Tracks not found on destination:");
            for label in &self.unmatched_tracks {
                info!("  - {label}");
            }
        }
        info!("Success rate: {:.1}%", self.success_rate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total_tracks: usize) -> TransferReport {
        TransferReport::new(
            "Road Trip".into(),
            PlaylistHandle {
                id: "uuid".into(),
                name: "Road Trip".into(),
            },
            total_tracks,
        )
    }

    #[test]
    fn success_rate_is_a_percentage() {
        let mut report = report(100);
        report.record_batch(80, true);
        report.record_batch(20, false);
        assert!((report.success_rate() - 80.0).abs() < f64::EPSILON);
        assert!(report.is_complete());
    }

    #[test]
    fn empty_playlist_has_zero_success_rate() {
        let report = report(0);
        assert!(report.success_rate().abs() < f64::EPSILON);
        assert!(report.is_complete());
    }

    #[test]
    fn two_of_three_rounds_to_one_decimal() {
        let mut report = report(3);
        report.record_batch(2, true);
        report.record_unmatched("Nobody - Nothing".into());
        assert_eq!(format!("{:.1}", report.success_rate()), "66.7");
        assert_eq!(report.unmatched_tracks, vec!["Nobody - Nothing".to_string()]);
        assert!(report.is_complete());
    }
}
