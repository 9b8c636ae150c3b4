//! Marker bit checker.

use contracts::{
    CheckError, CheckerConfig, ContractError, MarkerBitSettings, SampleChecker, SyncPoint, Verdict,
};
use tracing::{debug, instrument};

use crate::word::{read_word, write_word};

/// Accepts samples whose value intersects `marker_mask`, then clears
/// `reset_mask` from the sample in place.
#[derive(Debug, Clone)]
pub struct MarkerBitChecker {
    config: CheckerConfig,
    marker_mask: u64,
    reset_mask: u64,
}

impl MarkerBitChecker {
    /// # Errors
    /// Any construction-time invariant violation.
    pub fn new(settings: &MarkerBitSettings) -> Result<Self, ContractError> {
        settings.validate()?;

        Ok(Self {
            config: settings.config(),
            marker_mask: settings.marker_mask,
            reset_mask: settings.resolved_reset_mask(),
        })
    }

    pub fn marker_mask(&self) -> u64 {
        self.marker_mask
    }

    pub fn reset_mask(&self) -> u64 {
        self.reset_mask
    }

    #[inline]
    fn has_marker(&self, value: u64) -> bool {
        value & self.marker_mask != 0
    }
}

impl SampleChecker for MarkerBitChecker {
    fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn check(&mut self, sample: &mut [u8]) -> Result<Verdict, CheckError> {
        self.config.ensure_sample(sample)?;
        let width = self.config.sample_len();
        let value = read_word(sample, width);

        if !self.has_marker(value) {
            return Ok(Verdict::Rejected);
        }

        write_word(value & !self.reset_mask, sample, width);
        Ok(Verdict::Accepted)
    }

    #[instrument(
        name = "marker_synchronise",
        level = "debug",
        skip(self, frames),
        fields(len = frames.len(), lane_stride = lane_stride)
    )]
    fn synchronise(&mut self, frames: &[u8], lane_stride: usize) -> Result<SyncPoint, CheckError> {
        self.config.ensure_lane_stride(lane_stride)?;

        let width = self.config.sample_len();
        let mut last_candidate = None;
        let mut idx = 0;

        while idx + width <= frames.len() {
            let value = read_word(&frames[idx..], width);
            if self.has_marker(value) {
                debug!(offset = idx, value, "marker located");
                return Ok(SyncPoint {
                    offset: idx,
                    run_len: 1,
                    forward: true,
                });
            }
            last_candidate = Some(value);
            idx += width;
        }

        Err(CheckError::SyncNotFound {
            offset: idx,
            last_candidate,
        })
    }

    fn scrub(&self, sample: &mut [u8]) {
        let width = self.config.sample_len();
        if sample.len() >= width {
            let value = read_word(sample, width);
            write_word(value & !self.reset_mask, sample, width);
        }
    }
}
