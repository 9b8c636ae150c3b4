//! Reference frame producer.
//!
//! Slices an arbitrarily chunked byte stream into fixed-size packets, runs the
//! leading sample of each packet through the checker, and falls back to
//! `synchronise` over a window of whole packets after a mismatch.

use bytes::{Buf, BytesMut};
use contracts::{
    AcceptedPacket, AcquisitionConfig, CheckError, ContractError, EngineStats, SampleChecker,
    StreamBlueprint, Verdict,
};
use tracing::{debug, info, instrument, warn};

use crate::{Checker, EngineError};

/// Lock state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Hunting for a frame boundary
    Searching,
    /// Draining the packets of a located run
    Admitting { remaining: usize, forward: bool },
    /// Steady state: one check per packet
    Locked,
}

/// Packetizer driving one checker over a continuous stream
#[derive(Debug)]
pub struct AcquisitionEngine {
    checker: Checker,
    packet_size: usize,
    max_sync_failures: u32,
    /// Carry-over bytes not yet consumed
    pending: BytesMut,
    /// Absolute stream offset of `pending[0]`
    pending_offset: u64,
    state: LockState,
    next_packet_id: u64,
    consecutive_failures: u32,
    stats: EngineStats,
}

impl AcquisitionEngine {
    /// Create an engine around an already built checker
    ///
    /// # Errors
    /// `packet_size` is zero or not a multiple of the sample size.
    pub fn new(
        checker: Checker,
        packet_size: usize,
        acquisition: &AcquisitionConfig,
    ) -> Result<Self, EngineError> {
        let sample_size = checker.config().sample_len();
        if packet_size == 0 || packet_size % sample_size != 0 {
            return Err(ContractError::config_validation(
                "acquisition.packet_size",
                format!(
                    "packet_size ({packet_size}) must be a positive multiple of sample_size ({sample_size})"
                ),
            )
            .into());
        }

        let state = if acquisition.start_locked {
            LockState::Locked
        } else {
            LockState::Searching
        };
        let window = checker.config().run_len() * packet_size;

        Ok(Self {
            checker,
            packet_size,
            max_sync_failures: acquisition.max_sync_failures,
            pending: BytesMut::with_capacity(acquisition.read_chunk + window),
            pending_offset: 0,
            state,
            next_packet_id: 0,
            consecutive_failures: 0,
            stats: EngineStats::default(),
        })
    }

    /// Build checker and engine from a whole configuration
    pub fn from_blueprint(blueprint: &StreamBlueprint) -> Result<Self, EngineError> {
        let checker = Checker::from_settings(&blueprint.checker)?;
        Self::new(checker, blueprint.packet_size(), &blueprint.acquisition)
    }

    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Bytes buffered but not yet consumed
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Absolute offset one past the last byte pushed
    pub fn stream_position(&self) -> u64 {
        self.pending_offset + self.pending.len() as u64
    }

    /// Feed one acquisition cycle's bytes, appending forwarded packets to `out`.
    ///
    /// Packets already appended stay in `out` when an error is returned.
    ///
    /// # Errors
    /// Hard checker errors and [`EngineError::SyncLost`].
    #[instrument(
        name = "acquisition_push",
        level = "trace",
        skip(self, chunk, out),
        fields(len = chunk.len(), stream_offset = self.pending_offset)
    )]
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<AcceptedPacket>) -> Result<(), EngineError> {
        self.pending.extend_from_slice(chunk);
        while self.step(out)? {}
        Ok(())
    }

    /// Drop whatever never formed a full packet and return its length
    pub fn finish(&mut self) -> usize {
        let trailing = self.pending.len();
        if trailing > 0 {
            debug!(
                trailing,
                stream_offset = self.pending_offset,
                "trailing bytes never formed a packet"
            );
            self.pending_offset += trailing as u64;
            self.pending.clear();
        }
        trailing
    }

    fn step(&mut self, out: &mut Vec<AcceptedPacket>) -> Result<bool, EngineError> {
        match self.state {
            LockState::Locked => self.step_locked(out),
            LockState::Searching => self.step_searching(),
            LockState::Admitting { remaining, forward } => {
                Ok(self.step_admitting(remaining, forward, out))
            }
        }
    }

    fn step_locked(&mut self, out: &mut Vec<AcceptedPacket>) -> Result<bool, EngineError> {
        if self.pending.len() < self.packet_size {
            return Ok(false);
        }

        match self.checker.check(&mut self.pending[..self.packet_size])? {
            Verdict::Accepted => self.take_packet(true, out),
            Verdict::Gated => self.take_packet(false, out),
            Verdict::Rejected => {
                self.stats.packets_rejected += 1;
                metrics::counter!("acquisition_packets_total", "verdict" => "rejected")
                    .increment(1);
                warn!(
                    stream_offset = self.pending_offset,
                    strategy = self.checker.strategy(),
                    "packet rejected, resynchronising"
                );
                self.state = LockState::Searching;
            }
        }
        Ok(true)
    }

    #[instrument(
        name = "acquisition_search",
        level = "debug",
        skip(self),
        fields(stream_offset = self.pending_offset)
    )]
    fn step_searching(&mut self) -> Result<bool, EngineError> {
        let window = self.checker.config().run_len() * self.packet_size;
        if self.pending.len() < window {
            return Ok(false);
        }

        self.stats.sync_attempts += 1;
        match self
            .checker
            .synchronise(&self.pending[..window], self.packet_size)
        {
            Ok(point) => {
                self.discard(point.offset);
                self.stats.sync_successes += 1;
                self.consecutive_failures = 0;
                metrics::counter!("acquisition_sync_attempts_total", "result" => "found")
                    .increment(1);
                info!(
                    stream_offset = self.pending_offset,
                    run_len = point.run_len,
                    forward = point.forward,
                    "frame boundary located"
                );
                self.state = LockState::Admitting {
                    remaining: point.run_len,
                    forward: point.forward,
                };
                Ok(true)
            }
            Err(CheckError::SyncNotFound {
                offset,
                last_candidate,
            }) => {
                let skip = offset
                    .max(self.checker.config().sample_len())
                    .min(self.pending.len());
                self.discard(skip);
                self.stats.sync_failures += 1;
                self.consecutive_failures += 1;
                metrics::counter!("acquisition_sync_attempts_total", "result" => "not_found")
                    .increment(1);
                debug!(
                    skipped = skip,
                    ?last_candidate,
                    failures = self.consecutive_failures,
                    "no frame boundary in window"
                );

                if self.max_sync_failures > 0
                    && self.consecutive_failures >= self.max_sync_failures
                {
                    warn!(
                        attempts = self.consecutive_failures,
                        stream_offset = self.pending_offset,
                        "giving up on synchronisation"
                    );
                    return Err(EngineError::SyncLost {
                        attempts: self.consecutive_failures,
                        offset: self.pending_offset,
                        last_candidate,
                    });
                }
                Ok(true)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn step_admitting(
        &mut self,
        remaining: usize,
        forward: bool,
        out: &mut Vec<AcceptedPacket>,
    ) -> bool {
        if self.pending.len() < self.packet_size {
            return false;
        }

        self.checker.scrub(&mut self.pending[..self.packet_size]);
        // The gate threshold may sit anywhere inside the run
        let forward = forward || self.checker.admit(&self.pending[..self.packet_size]);
        self.take_packet(forward, out);

        self.state = match remaining.saturating_sub(1) {
            0 => LockState::Locked,
            left => LockState::Admitting {
                remaining: left,
                forward,
            },
        };
        true
    }

    fn take_packet(&mut self, forward: bool, out: &mut Vec<AcceptedPacket>) {
        let payload = self.pending.split_to(self.packet_size).freeze();
        let stream_offset = self.pending_offset;
        self.pending_offset += self.packet_size as u64;

        if forward {
            out.push(AcceptedPacket {
                packet_id: self.next_packet_id,
                stream_offset,
                payload,
            });
            self.next_packet_id += 1;
            self.stats.packets_accepted += 1;
            metrics::counter!("acquisition_packets_total", "verdict" => "accepted").increment(1);
        } else {
            self.stats.packets_gated += 1;
            metrics::counter!("acquisition_packets_total", "verdict" => "gated").increment(1);
        }
    }

    fn discard(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.pending.advance(len);
        self.pending_offset += len as u64;
        self.stats.bytes_discarded += len as u64;
        metrics::counter!("acquisition_bytes_discarded_total").increment(len as u64);
    }
}
