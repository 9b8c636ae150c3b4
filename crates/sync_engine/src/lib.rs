//! # Sync Engine
//!
//! Sample checking strategies and the acquisition engine that drives them.
//!
//! - `SequenceCounterChecker`: counter-stamped samples, throttled comparison,
//!   acquisition gate
//! - `MarkerBitChecker`: marker bit test with in-place bit clearing
//! - `AcquisitionEngine`: packetizes a raw stream, checks each packet header,
//!   resynchronises after a mismatch
//!
//! ## Usage
//!
//! ```ignore
//! use sync_engine::AcquisitionEngine;
//!
//! let mut engine = AcquisitionEngine::from_blueprint(&blueprint)?;
//! let mut accepted = Vec::new();
//!
//! // Once per acquisition cycle
//! engine.push(&chunk, &mut accepted)?;
//! for packet in accepted.drain(..) {
//!     // Hand over to the dispatcher
//! }
//! ```

mod checker;
mod counter;
mod engine;
mod error;
mod marker;
mod word;

pub use checker::Checker;
pub use counter::SequenceCounterChecker;
pub use engine::{AcquisitionEngine, LockState};
pub use error::EngineError;
pub use marker::MarkerBitChecker;
pub use word::{read_word, truncate, write_word};

// Re-export contracts types
pub use contracts::{AcceptedPacket, CheckError, EngineStats, SampleChecker, SyncPoint, Verdict};
