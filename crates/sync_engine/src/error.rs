//! Acquisition engine errors

use contracts::{CheckError, ContractError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed checker call
    #[error(transparent)]
    Check(#[from] CheckError),

    /// Too many consecutive recoveries failed
    #[error(
        "sync lost after {attempts} consecutive failed attempts at stream offset {offset} (last candidate: {last_candidate:?})"
    )]
    SyncLost {
        attempts: u32,
        offset: u64,
        last_candidate: Option<u64>,
    },

    /// Invalid engine configuration
    #[error(transparent)]
    Config(#[from] ContractError),
}
