//! Closed set of checking strategies behind one type.

use contracts::{
    CheckError, CheckerConfig, CheckerSettings, ContractError, SampleChecker, SyncPoint, Verdict,
};

use crate::{MarkerBitChecker, SequenceCounterChecker};

/// Strategy selected by configuration
#[derive(Debug, Clone)]
pub enum Checker {
    SequenceCounter(SequenceCounterChecker),
    MarkerBit(MarkerBitChecker),
}

impl Checker {
    /// Build the checker named by `settings`
    ///
    /// # Errors
    /// Settings that violate the strategy's invariants.
    pub fn from_settings(settings: &CheckerSettings) -> Result<Self, ContractError> {
        Ok(match settings {
            CheckerSettings::SequenceCounter(s) => {
                Self::SequenceCounter(SequenceCounterChecker::new(s)?)
            }
            CheckerSettings::MarkerBit(s) => Self::MarkerBit(MarkerBitChecker::new(s)?),
        })
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Self::SequenceCounter(_) => "sequence_counter",
            Self::MarkerBit(_) => "marker_bit",
        }
    }
}

impl SampleChecker for Checker {
    fn config(&self) -> &CheckerConfig {
        match self {
            Self::SequenceCounter(c) => c.config(),
            Self::MarkerBit(c) => c.config(),
        }
    }

    fn check(&mut self, sample: &mut [u8]) -> Result<Verdict, CheckError> {
        match self {
            Self::SequenceCounter(c) => c.check(sample),
            Self::MarkerBit(c) => c.check(sample),
        }
    }

    fn synchronise(&mut self, frames: &[u8], lane_stride: usize) -> Result<SyncPoint, CheckError> {
        match self {
            Self::SequenceCounter(c) => c.synchronise(frames, lane_stride),
            Self::MarkerBit(c) => c.synchronise(frames, lane_stride),
        }
    }

    fn scrub(&self, sample: &mut [u8]) {
        match self {
            Self::SequenceCounter(c) => c.scrub(sample),
            Self::MarkerBit(c) => c.scrub(sample),
        }
    }

    fn admit(&mut self, sample: &[u8]) -> bool {
        match self {
            Self::SequenceCounter(c) => c.admit(sample),
            Self::MarkerBit(c) => c.admit(sample),
        }
    }
}

impl From<SequenceCounterChecker> for Checker {
    fn from(checker: SequenceCounterChecker) -> Self {
        Self::SequenceCounter(checker)
    }
}

impl From<MarkerBitChecker> for Checker {
    fn from(checker: MarkerBitChecker) -> Self {
        Self::MarkerBit(checker)
    }
}
