//! AcceptedPacket - Acquisition engine output
//!
//! Packets admitted downstream plus the engine's running counters.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A packet that passed the checker and may be forwarded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedPacket {
    /// Sequence number assigned by the engine (monotonically increasing)
    pub packet_id: u64,

    /// Absolute byte offset of the packet in the raw stream
    pub stream_offset: u64,

    /// Packet bytes, leading sample already rewritten by the checker (zero-copy)
    pub payload: Bytes,
}

impl AcceptedPacket {
    /// Packet length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Leading `sample_size` bytes decoded as a little-endian word
    pub fn leading_word(&self, sample_size: usize) -> u64 {
        let width = sample_size.min(8).min(self.payload.len());
        let mut word = [0u8; 8];
        word[..width].copy_from_slice(&self.payload[..width]);
        u64::from_le_bytes(word)
    }
}

/// Running counters of one acquisition session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Packets forwarded downstream
    pub packets_accepted: u64,

    /// Valid packets held back by the acquisition gate
    pub packets_gated: u64,

    /// Steady-state check failures
    pub packets_rejected: u64,

    /// `synchronise` calls
    pub sync_attempts: u64,

    /// Successful `synchronise` calls
    pub sync_successes: u64,

    /// Failed `synchronise` calls
    pub sync_failures: u64,

    /// Bytes skipped while hunting for a frame boundary
    pub bytes_discarded: u64,
}

impl EngineStats {
    /// Fraction of valid packets among all checked ones, in percent
    pub fn validity_rate(&self) -> f64 {
        let valid = self.packets_accepted + self.packets_gated;
        let total = valid + self.packets_rejected;
        if total == 0 {
            0.0
        } else {
            valid as f64 / total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_word() {
        let packet = AcceptedPacket {
            packet_id: 0,
            stream_offset: 0,
            payload: Bytes::from_static(&[0x34, 0x12, 0xFF, 0xFF]),
        };
        assert_eq!(packet.leading_word(2), 0x1234);
        assert_eq!(packet.len(), 4);
    }

    #[test]
    fn test_validity_rate() {
        let stats = EngineStats {
            packets_accepted: 6,
            packets_gated: 2,
            packets_rejected: 2,
            ..Default::default()
        };
        assert!((stats.validity_rate() - 80.0).abs() < 1e-9);
        assert_eq!(EngineStats::default().validity_rate(), 0.0);
    }
}
