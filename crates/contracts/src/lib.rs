//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Sample Model
//! - A sample is `sample_size` little-endian bytes read as an unsigned integer
//! - A packet is `packet_size` bytes whose leading sample is checked

mod blueprint;
mod checker;
mod error;
mod packet;
mod sink;

pub use blueprint::*;
pub use checker::*;
pub use error::*;
pub use packet::*;
pub use sink::*;
