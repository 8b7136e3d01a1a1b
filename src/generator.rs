use crate::builder::Builder;
use crate::error::Error;
use crate::id::FloeId;
use crate::time::{SystemClock, TICK_NANOS, TimeSource, ticks};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Mutable generator state, guarded by the instance's mutex.
///
/// `elapsed` is the logical clock: the highest tick assigned so far. It never
/// decreases, so it may run ahead of wall-clock time after a backward clock
/// jump; wall time catches it passively. Ticks are signed so that a wall
/// clock observed before the epoch compares correctly against it.
struct State {
    elapsed: i64,
    sequence: u16,
}

/// A thread-safe unique ID generator.
///
/// Every call to [`next_id`] runs under a single exclusive lock. When the 256
/// sequence slots of the current tick are exhausted, or the wall clock has
/// jumped backward past the logical clock, the call sleeps until the next
/// tick boundary *while holding the lock*. Concurrent callers queue behind
/// it; this serialization is the crate's backpressure mechanism and the basis
/// of its uniqueness guarantee, so there is no lock-free fast path.
///
/// Cloning is cheap and clones share state, so a generator can be cloned into
/// other threads (or wrapped in an [`Arc`] and shared by reference).
///
/// # Example
///
/// ```
/// use floeid::FloeGenerator;
/// use std::thread;
///
/// # fn main() -> Result<(), floeid::Error> {
/// let generator = FloeGenerator::builder()
///     .machine_id(|| Ok::<_, core::convert::Infallible>(1))
///     .build()?;
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let generator = generator.clone();
///         thread::spawn(move || generator.next_id().unwrap())
///     })
///     .collect();
///
/// for handle in handles {
///     let id = handle.join().unwrap();
///     assert_eq!(id.machine_id(), 1);
/// }
/// # Ok(())
/// # }
/// ```
///
/// [`next_id`]: FloeGenerator::next_id
pub struct FloeGenerator<C = SystemClock> {
    state: Arc<Mutex<State>>,
    start_tick: i64,
    machine_id: u16,
    clock: C,
}

impl<C> Clone for FloeGenerator<C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            start_tick: self.start_tick,
            machine_id: self.machine_id,
            clock: self.clock.clone(),
        }
    }
}

impl FloeGenerator<SystemClock> {
    /// Constructs a generator with the default configuration: the default
    /// epoch and a machine id derived from the host's private IPv4 address.
    ///
    /// # Errors
    ///
    /// Fails if no private IPv4 address can be resolved.
    pub fn new() -> Result<Self, Error> {
        Builder::new().build()
    }

    /// Returns a [`Builder`] for custom configuration.
    pub fn builder() -> Builder<SystemClock> {
        Builder::new()
    }
}

impl<C> FloeGenerator<C>
where
    C: TimeSource,
{
    pub(crate) fn with_parts(epoch: Duration, machine_id: u16, clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                elapsed: 0,
                // Max, so the first call lands on sequence 0 either way.
                sequence: u16::from(FloeId::MAX_SEQUENCE),
            })),
            start_tick: ticks(epoch),
            machine_id,
            clock,
        }
    }

    /// The machine id encoded into every generated id.
    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    /// Generates the next unique ID.
    ///
    /// May block for up to roughly one tick (10 ms), plus the magnitude of
    /// any backward clock jump, while holding the internal lock. A caller
    /// that needs bounded latency must layer its own cancellation on top.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimeOverflow`] once the tick count no longer fits in
    /// 39 bits. The logical clock only grows, so every subsequent call fails
    /// the same way.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<FloeId, Error> {
        const SEQUENCE_MASK: u16 = FloeId::MAX_SEQUENCE as u16;

        let mut state = self.state.lock();

        let current = ticks(self.clock.now()) - self.start_tick;
        if state.elapsed < current {
            // Common case: the clock advanced into a fresh tick.
            state.elapsed = current;
            state.sequence = 0;
        } else {
            // Still inside tick `elapsed`, or the wall clock jumped backward.
            // Either way the logical clock stands and the sequence advances.
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.elapsed += 1;
                let overtime = state.elapsed - current;
                self.wait_until_tick(overtime);
            }
        }

        if state.elapsed >= 1 << FloeId::TIMESTAMP_BITS {
            return Err(Error::TimeOverflow);
        }

        Ok(FloeId::from_parts(
            state.elapsed as u64,
            state.sequence as u8,
            self.machine_id,
        ))
    }

    /// Sleeps until wall-clock time reaches the start of the tick `overtime`
    /// ticks ahead of the current one. The caller holds the state lock for
    /// the duration, queueing all concurrent callers.
    #[cold]
    fn wait_until_tick(&self, overtime: i64) {
        #[cfg(feature = "tracing")]
        tracing::trace!(overtime, "sequence exhausted, waiting for next tick");

        let remainder = (self.clock.now().as_nanos() % TICK_NANOS as u128) as u64;
        // overtime >= 1 here, so the sleep is always positive.
        thread::sleep(Duration::from_nanos(overtime as u64 * TICK_NANOS - remainder));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxDynError;
    use crate::time::DEFAULT_EPOCH;
    use core::convert::Infallible;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::io;
    use std::rc::Rc;
    use std::time::Instant;

    /// A time source frozen at a fixed offset past the default epoch.
    #[derive(Clone, Copy)]
    struct FixedClock {
        now: Duration,
    }

    impl FixedClock {
        fn at_epoch_offset(offset: Duration) -> Self {
            Self {
                now: DEFAULT_EPOCH + offset,
            }
        }
    }

    impl TimeSource for FixedClock {
        fn now(&self) -> Duration {
            self.now
        }
    }

    /// A time source stepping through a scripted series of instants.
    struct StepClock {
        values: Vec<Duration>,
        index: Cell<usize>,
    }

    impl TimeSource for Rc<StepClock> {
        fn now(&self) -> Duration {
            self.values[self.index.get()]
        }
    }

    fn machine_one() -> Result<u16, Infallible> {
        Ok(1)
    }

    #[test]
    fn first_ids_at_epoch_plus_20ms() {
        let clock = FixedClock::at_epoch_offset(Duration::from_millis(20));
        let generator = FloeGenerator::builder()
            .clock(clock)
            .machine_id(machine_one)
            .build()
            .unwrap();

        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 2);
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.machine_id(), 1);

        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 2);
        assert_eq!(id.sequence(), 1);
        assert_eq!(id.machine_id(), 1);
    }

    #[test]
    fn sequence_increments_within_same_tick() {
        let clock = FixedClock::at_epoch_offset(Duration::from_millis(420));
        let generator = FloeGenerator::builder()
            .clock(clock)
            .machine_id(machine_one)
            .build()
            .unwrap();

        let id1 = generator.next_id().unwrap();
        let id2 = generator.next_id().unwrap();
        let id3 = generator.next_id().unwrap();

        assert_eq!(id1.timestamp(), 42);
        assert_eq!(id2.timestamp(), 42);
        assert_eq!(id3.timestamp(), 42);
        assert_eq!(id1.sequence(), 0);
        assert_eq!(id2.sequence(), 1);
        assert_eq!(id3.sequence(), 2);
        assert!(id1 < id2 && id2 < id3);
    }

    #[test]
    fn sequence_exhaustion_advances_tick_and_blocks() {
        let clock = FixedClock::at_epoch_offset(Duration::from_millis(20));
        let generator = FloeGenerator::builder()
            .clock(clock)
            .machine_id(machine_one)
            .build()
            .unwrap();

        for seq in 0..=u16::from(FloeId::MAX_SEQUENCE) {
            let id = generator.next_id().unwrap();
            assert_eq!(id.timestamp(), 2);
            assert_eq!(id.sequence(), seq as u8);
        }

        // All 256 slots of tick 2 are spent: the 257th call claims tick 3 and
        // sleeps one full tick (the mocked instant sits exactly on a tick
        // boundary) before returning.
        let start = Instant::now();
        let id = generator.next_id().unwrap();
        let waited = start.elapsed();

        assert_eq!(id.timestamp(), 3);
        assert_eq!(id.sequence(), 0);
        assert!(waited >= Duration::from_millis(10), "waited {waited:?}");
    }

    #[test]
    fn backward_clock_jump_keeps_ids_increasing() {
        let clock = Rc::new(StepClock {
            values: vec![
                DEFAULT_EPOCH + Duration::from_millis(50),
                DEFAULT_EPOCH + Duration::from_millis(20),
            ],
            index: Cell::new(0),
        });
        let generator = FloeGenerator::builder()
            .clock(Rc::clone(&clock))
            .machine_id(machine_one)
            .build()
            .unwrap();

        let id1 = generator.next_id().unwrap();
        assert_eq!(id1.timestamp(), 5);
        assert_eq!(id1.sequence(), 0);

        // The wall clock jumps back by 30 ms. The logical clock stands at
        // tick 5 and the sequence keeps advancing without error or sleep.
        clock.index.set(1);
        let id2 = generator.next_id().unwrap();
        assert_eq!(id2.timestamp(), 5);
        assert_eq!(id2.sequence(), 1);

        let id3 = generator.next_id().unwrap();
        assert_eq!(id3.timestamp(), 5);
        assert_eq!(id3.sequence(), 2);

        assert!(id1 < id2 && id2 < id3);
    }

    #[test]
    fn tick_overflow_is_a_sticky_error() {
        let over = Duration::from_nanos((1u64 << FloeId::TIMESTAMP_BITS) * TICK_NANOS);
        let clock = FixedClock::at_epoch_offset(over);
        let generator = FloeGenerator::builder()
            .clock(clock)
            .machine_id(machine_one)
            .build()
            .unwrap();

        assert!(matches!(generator.next_id(), Err(Error::TimeOverflow)));
        assert!(matches!(generator.next_id(), Err(Error::TimeOverflow)));
        assert!(matches!(generator.next_id(), Err(Error::TimeOverflow)));
    }

    #[test]
    fn last_tick_before_overflow_still_generates() {
        let last = Duration::from_nanos(((1u64 << FloeId::TIMESTAMP_BITS) - 1) * TICK_NANOS);
        let clock = FixedClock::at_epoch_offset(last);
        let generator = FloeGenerator::builder()
            .clock(clock)
            .machine_id(machine_one)
            .build()
            .unwrap();

        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), FloeId::MAX_TIMESTAMP);
    }

    #[test]
    fn ids_are_unique_and_monotonic_single_threaded() {
        let generator = FloeGenerator::builder()
            .machine_id(machine_one)
            .build()
            .unwrap();

        let mut previous = generator.next_id().unwrap();
        for _ in 0..2_048 {
            let id = generator.next_id().unwrap();
            assert!(id > previous);
            assert!(
                id.timestamp() > previous.timestamp()
                    || (id.timestamp() == previous.timestamp()
                        && id.sequence() == previous.sequence() + 1)
            );
            previous = id;
        }
    }

    #[test]
    fn ids_are_unique_across_threads() {
        const THREADS: usize = 8;
        const IDS_PER_THREAD: usize = 512;

        let generator = FloeGenerator::builder()
            .machine_id(machine_one)
            .build()
            .unwrap();

        let mut seen = HashSet::with_capacity(THREADS * IDS_PER_THREAD);
        thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let generator = generator.clone();
                    s.spawn(move || {
                        (0..IDS_PER_THREAD)
                            .map(|_| generator.next_id().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for handle in handles {
                for id in handle.join().unwrap() {
                    assert!(seen.insert(id), "duplicate id {id}");
                }
            }
        });
        assert_eq!(seen.len(), THREADS * IDS_PER_THREAD);
    }

    #[test]
    fn future_epoch_fails_construction() {
        let clock = FixedClock::at_epoch_offset(Duration::from_millis(20));
        let result = FloeGenerator::builder()
            .clock(clock)
            .epoch(DEFAULT_EPOCH + Duration::from_secs(1))
            .machine_id(machine_one)
            .build();
        assert!(matches!(result, Err(Error::FutureEpoch)));
    }

    #[test]
    fn epoch_equal_to_now_is_accepted() {
        let clock = FixedClock::at_epoch_offset(Duration::ZERO);
        let generator = FloeGenerator::builder()
            .clock(clock)
            .epoch(DEFAULT_EPOCH)
            .machine_id(machine_one)
            .build()
            .unwrap();

        // current tick is 0 and the generator starts at logical tick 0, so
        // the first call takes the exhaustion path into tick 1.
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 1);
        assert_eq!(id.sequence(), 0);
    }

    #[test]
    fn failing_provider_fails_construction() {
        let result = FloeGenerator::builder()
            .machine_id(|| -> Result<u16, BoxDynError> {
                Err(io::Error::other("registry down").into())
            })
            .build();
        assert!(matches!(result, Err(Error::MachineIdFailed(_))));
    }

    #[test]
    fn rejected_machine_id_fails_construction() {
        let result = FloeGenerator::builder()
            .machine_id(machine_one)
            .check_machine_id(|id| id != 1)
            .build();
        assert!(matches!(result, Err(Error::MachineIdRejected)));
    }

    #[test]
    fn accepted_machine_id_builds() {
        let generator = FloeGenerator::builder()
            .machine_id(machine_one)
            .check_machine_id(|id| id == 1)
            .build()
            .unwrap();
        assert_eq!(generator.machine_id(), 1);
    }
}
