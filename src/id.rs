use crate::time::TICK_NANOS;
use core::fmt;
use core::time::Duration;

/// A 64-bit unique identifier.
///
/// Layout, most significant bit first:
///
/// ```text
/// 0 | 39-bit timestamp (10 ms ticks) | 8-bit sequence | 16-bit machine id
/// ```
///
/// The top bit is always zero. Comparing two IDs numerically compares their
/// generation order for a single machine. The field accessors are pure and
/// work on any id, including ones produced by another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FloeId(u64);

impl FloeId {
    /// Bit length of the timestamp field.
    pub const TIMESTAMP_BITS: u32 = 39;
    /// Bit length of the sequence field.
    pub const SEQUENCE_BITS: u32 = 8;
    /// Bit length of the machine-id field.
    pub const MACHINE_ID_BITS: u32 = 16;

    /// Largest representable tick count: `2^39 - 1`.
    pub const MAX_TIMESTAMP: u64 = (1 << Self::TIMESTAMP_BITS) - 1;
    /// Largest per-tick sequence number.
    pub const MAX_SEQUENCE: u8 = u8::MAX;
    /// Largest machine id.
    pub const MAX_MACHINE_ID: u16 = u16::MAX;

    const TIMESTAMP_SHIFT: u32 = Self::SEQUENCE_BITS + Self::MACHINE_ID_BITS;
    const SEQUENCE_SHIFT: u32 = Self::MACHINE_ID_BITS;

    /// Packs the three fields into an id. The timestamp is masked to 39 bits,
    /// which also keeps the sign bit clear.
    pub const fn from_parts(timestamp: u64, sequence: u8, machine_id: u16) -> Self {
        Self(
            (timestamp & Self::MAX_TIMESTAMP) << Self::TIMESTAMP_SHIFT
                | (sequence as u64) << Self::SEQUENCE_SHIFT
                | machine_id as u64,
        )
    }

    /// Reinterprets a raw `u64` as an id, without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw `u64` representation.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Tick count elapsed between the epoch and generation of this id.
    pub const fn timestamp(self) -> u64 {
        self.0 >> Self::TIMESTAMP_SHIFT
    }

    /// Sequence number within the id's tick.
    pub const fn sequence(self) -> u8 {
        (self.0 >> Self::SEQUENCE_SHIFT) as u8
    }

    /// Machine id of the generating node.
    pub const fn machine_id(self) -> u16 {
        self.0 as u16
    }

    /// The unused top bit. Zero for every id this crate generates.
    pub const fn msb(self) -> u8 {
        (self.0 >> 63) as u8
    }

    /// Real-world time between the epoch and generation of this id
    /// (timestamp × 10 ms).
    pub const fn elapsed_time(self) -> Duration {
        Duration::from_nanos(self.timestamp() * TICK_NANOS)
    }

    /// Splits the id into all of its parts.
    pub const fn decompose(self) -> IdParts {
        IdParts {
            id: self.0,
            msb: self.msb(),
            timestamp: self.timestamp(),
            sequence: self.sequence(),
            machine_id: self.machine_id(),
        }
    }
}

impl fmt::Display for FloeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<FloeId> for u64 {
    fn from(id: FloeId) -> Self {
        id.to_raw()
    }
}

/// The constituent parts of a [`FloeId`], as returned by
/// [`FloeId::decompose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    /// The raw id.
    pub id: u64,
    /// The unused top bit.
    pub msb: u8,
    /// Tick count since the epoch.
    pub timestamp: u64,
    /// Per-tick sequence number.
    pub sequence: u8,
    /// Machine id of the generating node.
    pub machine_id: u16,
}
