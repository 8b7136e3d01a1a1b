use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of one tick. Every timestamp stored in a [`FloeId`] counts whole
/// ticks elapsed since the generator's epoch.
///
/// [`FloeId`]: crate::FloeId
pub const TICK: Duration = Duration::from_millis(10);

pub(crate) const TICK_NANOS: u64 = TICK.as_nanos() as u64;

/// Default epoch: Monday, September 1, 2014 00:00:00 UTC.
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_409_529_600_000);

/// A source of wall-clock time.
///
/// This abstraction lets you plug in the real system clock or a mocked time
/// source in tests. Implementations return the current time as a [`Duration`]
/// since the Unix epoch; the generator quantizes it into ticks itself, and
/// also uses the sub-tick remainder to time its backoff sleeps.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use floeid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn now(&self) -> Duration {
///         Duration::from_millis(1234)
///     }
/// }
///
/// assert_eq!(FixedTime.now().as_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current wall-clock time as a duration since the Unix
    /// epoch.
    fn now(&self) -> Duration;
}

/// The production [`TimeSource`], backed by [`SystemTime`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Duration {
        // A system clock before 1970 saturates to zero rather than panicking.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// Quantizes a wall-clock instant into whole ticks since the Unix epoch.
/// Truncates, never rounds. Signed so that a clock observed before the
/// generator's epoch produces a negative relative tick instead of wrapping.
pub(crate) fn ticks(since_unix: Duration) -> i64 {
    (since_unix.as_nanos() / TICK_NANOS as u128) as i64
}
