use thiserror::Error;

/// A boxed error, used by machine-id providers so callers can surface any
/// failure type from their own resolution logic.
pub type BoxDynError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// All error variants that `floeid` can emit.
///
/// The first four variants occur only at construction time and are fatal to
/// instance creation; retrying with the same configuration will not succeed.
/// [`Error::TimeOverflow`] is the sole runtime error: once the tick counter
/// outgrows its 39-bit budget, every subsequent call fails identically and
/// the generator should be treated as permanently retired.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured epoch is ahead of the current time.
    #[error("epoch is ahead of the current time")]
    FutureEpoch,

    /// No non-loopback private IPv4 address was found on any local interface.
    #[error("no private IPv4 address found")]
    NoPrivateIpv4,

    /// The machine-id provider returned an error.
    #[error("machine id resolution failed: {0}")]
    MachineIdFailed(#[source] BoxDynError),

    /// The machine-id validator rejected the resolved id.
    #[error("machine id rejected by validator")]
    MachineIdRejected,

    /// The elapsed time since the epoch no longer fits in 39 bits of 10 ms
    /// ticks.
    #[error("elapsed time exceeds the 39-bit tick budget")]
    TimeOverflow,
}
