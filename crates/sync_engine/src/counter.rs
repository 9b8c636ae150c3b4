//! Sequence counter checker.
//!
//! Each sample is expected to carry the next value of a counter that grows by
//! `counter_step`. Comparisons can be throttled to every `check_every` counts
//! and forwarding can be held back until the counter reaches `acquire_from`.

use contracts::{
    CheckError, CheckerConfig, ContractError, SampleChecker, SequenceCounterSettings, SyncPoint,
    Verdict,
};
use tracing::{debug, instrument, trace};

use crate::word::{read_word, truncate};

/// Checker for counter-stamped samples
#[derive(Debug, Clone)]
pub struct SequenceCounterChecker {
    config: CheckerConfig,
    /// Next expected counter value
    counter: u64,
    counter_step: u32,
    check_every: u32,
    /// Counter value at which the next enforced comparison happens
    next_check: u64,
    /// Gate threshold, 0 once the gate is open
    acquire_from: u64,
}

impl SequenceCounterChecker {
    /// Build a checker from validated settings
    ///
    /// # Errors
    /// Any construction-time invariant violation.
    pub fn new(settings: &SequenceCounterSettings) -> Result<Self, ContractError> {
        settings.validate()?;

        Ok(Self {
            config: settings.config(),
            counter: settings.first_counter,
            counter_step: settings.counter_step,
            check_every: settings.resolved_check_every(),
            next_check: settings.first_counter,
            acquire_from: settings.resolved_acquire_from(),
        })
    }

    /// Next expected counter value
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Counter value of the next enforced comparison
    pub fn next_check(&self) -> u64 {
        self.next_check
    }

    /// Gate threshold (0 = gate open)
    pub fn acquire_from(&self) -> u64 {
        self.acquire_from
    }

    pub fn is_gated(&self) -> bool {
        self.acquire_from != 0
    }

    fn width(&self) -> usize {
        self.config.sample_len()
    }

    fn matches(&self, value: u64, expected: u64) -> bool {
        value == truncate(expected, self.width())
    }

    /// Decide forwarding for a sample whose value is `value`.
    ///
    /// The gate opens once the validated counter has reached the threshold.
    /// While closed, the next sample is always compared.
    fn evaluate_gate(&mut self, value: u64) -> Verdict {
        if self.acquire_from == 0 {
            return Verdict::Accepted;
        }

        // `>=`, not `==`: a stream that starts past the threshold
        // (first_counter 2, acquire_from 1) forwards its first sample
        if value >= truncate(self.acquire_from, self.width()) {
            debug!(
                value,
                acquire_from = self.acquire_from,
                "acquisition gate opened"
            );
            self.acquire_from = 0;
            Verdict::Accepted
        } else {
            self.next_check = self.counter;
            Verdict::Gated
        }
    }
}

impl SampleChecker for SequenceCounterChecker {
    fn config(&self) -> &CheckerConfig {
        &self.config
    }

    fn check(&mut self, sample: &mut [u8]) -> Result<Verdict, CheckError> {
        self.config.ensure_sample(sample)?;
        let value = read_word(sample, self.width());

        if self.counter == self.next_check {
            if !self.matches(value, self.counter) {
                trace!(expected = self.counter, value, "counter mismatch");
                return Ok(Verdict::Rejected);
            }
            self.next_check = self.counter.wrapping_add(u64::from(self.check_every));
        }
        self.counter = self.counter.wrapping_add(u64::from(self.counter_step));

        Ok(self.evaluate_gate(value))
    }

    #[instrument(
        name = "counter_synchronise",
        level = "debug",
        skip(self, frames),
        fields(len = frames.len(), lane_stride = lane_stride)
    )]
    fn synchronise(&mut self, frames: &[u8], lane_stride: usize) -> Result<SyncPoint, CheckError> {
        self.config.ensure_lane_stride(lane_stride)?;

        let width = self.width();
        let run_len = self.config.run_len();
        let step = u64::from(self.counter_step);
        let mut last_candidate = None;

        let mut idx = 0;
        while idx < lane_stride && idx + width <= frames.len() {
            let candidate = read_word(&frames[idx..], width);
            last_candidate = Some(candidate);

            // Lanes outside the window, including unaddressable ones, never match
            let run_found = (1..run_len).all(|lane| {
                lane.checked_mul(lane_stride)
                    .and_then(|offset| offset.checked_add(idx))
                    .filter(|offset| {
                        offset
                            .checked_add(width)
                            .is_some_and(|end| end <= frames.len())
                    })
                    .is_some_and(|offset| {
                        self.matches(
                            read_word(&frames[offset..], width),
                            candidate.wrapping_add(lane as u64 * step),
                        )
                    })
            });

            if run_found {
                self.counter = candidate.wrapping_add(run_len as u64 * step);
                self.next_check = self
                    .counter
                    .wrapping_sub(step)
                    .wrapping_add(u64::from(self.check_every));
                let forward = self.evaluate_gate(candidate).should_forward();

                debug!(
                    offset = idx,
                    candidate,
                    counter = self.counter,
                    forward,
                    "counter run located"
                );
                return Ok(SyncPoint {
                    offset: idx,
                    run_len,
                    forward,
                });
            }

            idx += width;
        }

        Err(CheckError::SyncNotFound {
            offset: lane_stride,
            last_candidate,
        })
    }

    fn admit(&mut self, sample: &[u8]) -> bool {
        if !self.is_gated() {
            return true;
        }
        if sample.len() < self.width() {
            return false;
        }
        let value = read_word(sample, self.width());
        self.evaluate_gate(value).should_forward()
    }
}
