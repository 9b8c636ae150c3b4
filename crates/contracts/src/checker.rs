//! Sample checker contract
//!
//! Shared configuration, the verdict types and the `SampleChecker` trait every
//! checking strategy implements.

use serde::{Deserialize, Serialize};

use crate::{CheckError, ContractError};

/// Widest sample the checkers understand (samples are compared as `u64`)
pub const MAX_SAMPLE_SIZE: u8 = 8;

/// Configuration shared by every checking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Byte width of one sample
    pub sample_size: u8,

    /// Consecutive correctly spaced samples needed to declare sync
    pub frames_for_sync: u8,
}

impl CheckerConfig {
    /// Sample width as a slice length
    #[inline]
    pub fn sample_len(&self) -> usize {
        self.sample_size as usize
    }

    /// Run length as a lane count
    #[inline]
    pub fn run_len(&self) -> usize {
        self.frames_for_sync as usize
    }

    /// Fail unless `sample` holds at least one full sample
    #[inline]
    pub fn ensure_sample(&self, sample: &[u8]) -> Result<(), CheckError> {
        if sample.len() < self.sample_len() {
            return Err(CheckError::SampleTooShort {
                expected: self.sample_len(),
                actual: sample.len(),
            });
        }
        Ok(())
    }

    /// Fail unless `lane_stride` is a positive multiple of the sample size
    pub fn ensure_lane_stride(&self, lane_stride: usize) -> Result<(), CheckError> {
        if lane_stride == 0 {
            return Err(CheckError::LaneStrideZero);
        }
        if lane_stride % self.sample_len() != 0 {
            return Err(CheckError::MisalignedStride {
                stride: lane_stride,
                sample_size: self.sample_len(),
            });
        }
        Ok(())
    }

    fn validate(&self, prefix: &str) -> Result<(), ContractError> {
        if self.sample_size == 0 || self.sample_size > MAX_SAMPLE_SIZE {
            return Err(ContractError::config_validation(
                format!("{prefix}.sample_size"),
                format!(
                    "sample_size must be in 1..={MAX_SAMPLE_SIZE}, got {}",
                    self.sample_size
                ),
            ));
        }
        if self.frames_for_sync == 0 {
            return Err(ContractError::config_validation(
                format!("{prefix}.frames_for_sync"),
                "frames_for_sync must be > 0",
            ));
        }
        Ok(())
    }
}

/// Checker selection with per-strategy options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CheckerSettings {
    /// Samples carry a monotonically increasing counter
    SequenceCounter(SequenceCounterSettings),
    /// Samples carry marker bits
    MarkerBit(MarkerBitSettings),
}

impl CheckerSettings {
    /// Shared part of the configuration
    pub fn config(&self) -> CheckerConfig {
        match self {
            Self::SequenceCounter(s) => s.config(),
            Self::MarkerBit(s) => s.config(),
        }
    }

    /// Strategy name as written in configuration files
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::SequenceCounter(_) => "sequence_counter",
            Self::MarkerBit(_) => "marker_bit",
        }
    }

    /// Check every construction-time invariant of the selected strategy
    pub fn validate(&self) -> Result<(), ContractError> {
        match self {
            Self::SequenceCounter(s) => s.validate(),
            Self::MarkerBit(s) => s.validate(),
        }
    }
}

fn default_first_counter() -> u64 {
    1
}

fn default_counter_step() -> u32 {
    1
}

fn default_marker_frames() -> u8 {
    1
}

/// Options of the sequence counter strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounterSettings {
    pub sample_size: u8,

    pub frames_for_sync: u8,

    /// Initial expected counter value
    #[serde(default = "default_first_counter")]
    pub first_counter: u64,

    /// Gate threshold (None = `first_counter`, 0 = no gate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire_from: Option<u64>,

    /// Counter increment per sample
    #[serde(default = "default_counter_step")]
    pub counter_step: u32,

    /// Throttle period (None = `counter_step`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_every: Option<u32>,
}

impl SequenceCounterSettings {
    /// Settings with every optional field at its default
    pub fn new(sample_size: u8, frames_for_sync: u8) -> Self {
        Self {
            sample_size,
            frames_for_sync,
            first_counter: default_first_counter(),
            acquire_from: None,
            counter_step: default_counter_step(),
            check_every: None,
        }
    }

    pub fn config(&self) -> CheckerConfig {
        CheckerConfig {
            sample_size: self.sample_size,
            frames_for_sync: self.frames_for_sync,
        }
    }

    /// Gate threshold with the default applied
    pub fn resolved_acquire_from(&self) -> u64 {
        self.acquire_from.unwrap_or(self.first_counter)
    }

    /// Throttle period with the default applied
    pub fn resolved_check_every(&self) -> u32 {
        self.check_every.unwrap_or(self.counter_step)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        self.config().validate("checker")?;

        if self.frames_for_sync < 2 {
            return Err(ContractError::config_validation(
                "checker.frames_for_sync",
                format!(
                    "sequence_counter needs frames_for_sync > 1, got {}",
                    self.frames_for_sync
                ),
            ));
        }
        if self.counter_step == 0 {
            return Err(ContractError::config_validation(
                "checker.counter_step",
                "counter_step must be > 0",
            ));
        }

        let check_every = self.resolved_check_every();
        if check_every == 0 || check_every % self.counter_step != 0 {
            return Err(ContractError::config_validation(
                "checker.check_every",
                format!(
                    "check_every ({check_every}) must be a positive multiple of counter_step ({})",
                    self.counter_step
                ),
            ));
        }

        let acquire_from = self.resolved_acquire_from();
        if acquire_from != 0 {
            let distance = i128::from(acquire_from) - i128::from(self.first_counter);
            if distance % i128::from(self.counter_step) != 0 {
                return Err(ContractError::config_validation(
                    "checker.acquire_from",
                    format!(
                        "acquire_from ({acquire_from}) is not reachable from first_counter ({}) with counter_step ({})",
                        self.first_counter, self.counter_step
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Options of the marker bit strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerBitSettings {
    pub sample_size: u8,

    #[serde(default = "default_marker_frames")]
    pub frames_for_sync: u8,

    /// Bits that must intersect the sample value
    pub marker_mask: u64,

    /// Bits cleared after a match (None = `marker_mask`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_mask: Option<u64>,
}

impl MarkerBitSettings {
    pub fn new(sample_size: u8, marker_mask: u64) -> Self {
        Self {
            sample_size,
            frames_for_sync: default_marker_frames(),
            marker_mask,
            reset_mask: None,
        }
    }

    pub fn config(&self) -> CheckerConfig {
        CheckerConfig {
            sample_size: self.sample_size,
            frames_for_sync: self.frames_for_sync,
        }
    }

    pub fn resolved_reset_mask(&self) -> u64 {
        self.reset_mask.unwrap_or(self.marker_mask)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        self.config().validate("checker")?;

        if self.frames_for_sync != 1 {
            return Err(ContractError::config_validation(
                "checker.frames_for_sync",
                format!(
                    "marker_bit needs frames_for_sync == 1, got {}",
                    self.frames_for_sync
                ),
            ));
        }
        if self.marker_mask == 0 {
            return Err(ContractError::config_validation(
                "checker.marker_mask",
                "marker_mask must have at least one bit set",
            ));
        }
        Ok(())
    }
}

/// Outcome of checking one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Valid, forward downstream
    Accepted,
    /// Valid, but the acquisition gate is still closed
    Gated,
    /// Does not match the expected pattern; the caller should resynchronise
    Rejected,
}

impl Verdict {
    #[inline]
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    #[inline]
    pub fn should_forward(self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Gated => "gated",
            Self::Rejected => "rejected",
        }
    }
}

/// Frame boundary located by `synchronise`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPoint {
    /// Byte offset of the first sample of the run
    pub offset: usize,

    /// Lanes consumed by the run (`frames_for_sync`)
    pub run_len: usize,

    /// Whether the run may be forwarded (acquisition gate outcome)
    pub forward: bool,
}

/// Sample checking strategy
///
/// Implementations own only scalar state; every byte they look at is lent by
/// the caller for the duration of one call.
pub trait SampleChecker {
    /// Shared configuration
    fn config(&self) -> &CheckerConfig;

    /// Validate one sample, possibly rewriting it in place.
    ///
    /// # Errors
    /// Only for malformed calls (short sample). A mismatch is
    /// [`Verdict::Rejected`], not an error.
    fn check(&mut self, sample: &mut [u8]) -> Result<Verdict, CheckError>;

    /// Locate the frame boundary inside `frames`, whose lanes are
    /// `lane_stride` bytes apart. Never mutates `frames`.
    ///
    /// # Errors
    /// [`CheckError::SyncNotFound`] when the window holds no valid run,
    /// stride errors for a zero or misaligned `lane_stride`.
    fn synchronise(&mut self, frames: &[u8], lane_stride: usize) -> Result<SyncPoint, CheckError>;

    /// Fix up a sample admitted through `synchronise` the way a successful
    /// `check` would have rewritten it.
    fn scrub(&self, _sample: &mut [u8]) {}

    /// Forwarding decision for a sample of a run that `synchronise` located
    /// but did not clear for forwarding. Called once per run sample, in
    /// stream order, until it returns `true`.
    fn admit(&mut self, _sample: &[u8]) -> bool {
        true
    }
}
