//! Distributed unique ID generation without central coordination.
//!
//! A [`FloeId`] packs three fields into a single `u64`:
//!
//! - 39 bits of elapsed time since a configurable epoch, in 10 ms ticks
//! - 8 bits of per-tick sequence (up to 256 IDs per tick per node)
//! - 16 bits of machine id
//!
//! The top bit is always zero, so IDs stay positive when stored in signed
//! 64-bit columns. Ordering by the raw integer is generation order for a
//! single machine, and roughly time order across machines. The 39-bit tick
//! budget lasts about 174 years from the epoch.
//!
//! IDs are minted by a [`FloeGenerator`], which serializes all callers behind
//! a single lock. When the 256 sequence slots of a tick are exhausted, or the
//! wall clock has jumped backward, the generator sleeps until the next tick
//! boundary while still holding the lock. Queued callers wait behind it; that
//! is the crate's only backpressure mechanism.
//!
//! # Example
//!
//! ```
//! use floeid::FloeGenerator;
//!
//! # fn main() -> Result<(), floeid::Error> {
//! let generator = FloeGenerator::builder()
//!     .machine_id(|| Ok::<_, core::convert::Infallible>(42))
//!     .build()?;
//!
//! let id = generator.next_id()?;
//! assert_eq!(id.machine_id(), 42);
//! # Ok(())
//! # }
//! ```
//!
//! Without an explicit provider, the machine id defaults to the low 16 bits
//! of the host's first private IPv4 address.

mod builder;
mod error;
mod generator;
mod id;
mod machine;
#[cfg(feature = "serde")]
mod serde;
mod time;

pub use crate::builder::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::machine::*;
pub use crate::time::*;
