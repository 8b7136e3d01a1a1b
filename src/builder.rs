use crate::error::{BoxDynError, Error};
use crate::generator::FloeGenerator;
use crate::machine::lower_16_bit_private_ip;
use crate::time::{DEFAULT_EPOCH, SystemClock, TimeSource};
use core::time::Duration;

type MachineIdFn = Box<dyn Fn() -> Result<u16, BoxDynError>>;
type CheckMachineIdFn = Box<dyn Fn(u16) -> bool>;

/// Configures and constructs a [`FloeGenerator`].
///
/// All options have defaults: the epoch is [`DEFAULT_EPOCH`], the machine id
/// comes from [`lower_16_bit_private_ip`], no validation is performed, and
/// time is read from [`SystemClock`].
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use floeid::FloeGenerator;
///
/// # fn main() -> Result<(), floeid::Error> {
/// let generator = FloeGenerator::builder()
///     .epoch(Duration::from_millis(1_735_689_600_000)) // 2025-01-01 UTC
///     .machine_id(|| Ok::<_, core::convert::Infallible>(7))
///     .check_machine_id(|id| id != 0)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct Builder<C = SystemClock> {
    epoch: Duration,
    machine_id: Option<MachineIdFn>,
    check_machine_id: Option<CheckMachineIdFn>,
    clock: C,
}

impl Builder<SystemClock> {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            epoch: DEFAULT_EPOCH,
            machine_id: None,
            check_machine_id: None,
            clock: SystemClock,
        }
    }
}

impl Default for Builder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Builder<C>
where
    C: TimeSource,
{
    /// Sets the epoch from which ticks are counted, as a duration since the
    /// Unix epoch. Construction fails with [`Error::FutureEpoch`] if it is
    /// ahead of the current time.
    pub fn epoch(mut self, epoch: Duration) -> Self {
        self.epoch = epoch;
        self
    }

    /// Supplies a machine-id provider, run exactly once during [`build`].
    ///
    /// [`build`]: Builder::build
    pub fn machine_id<F, E>(mut self, provider: F) -> Self
    where
        F: Fn() -> Result<u16, E> + 'static,
        E: Into<BoxDynError>,
    {
        self.machine_id = Some(Box::new(move || provider().map_err(Into::into)));
        self
    }

    /// Supplies a predicate that must accept the resolved machine id, e.g. a
    /// central-registry uniqueness check. Rejection aborts construction.
    pub fn check_machine_id<F>(mut self, check: F) -> Self
    where
        F: Fn(u16) -> bool + 'static,
    {
        self.check_machine_id = Some(Box::new(check));
        self
    }

    /// Replaces the time source. Primarily useful for injecting deterministic
    /// clocks in tests.
    pub fn clock<T>(self, clock: T) -> Builder<T>
    where
        T: TimeSource,
    {
        Builder {
            epoch: self.epoch,
            machine_id: self.machine_id,
            check_machine_id: self.check_machine_id,
            clock,
        }
    }

    /// Resolves the machine id, validates the configuration, and constructs
    /// the generator.
    ///
    /// # Errors
    ///
    /// - [`Error::FutureEpoch`] if the epoch is ahead of the current time
    /// - [`Error::NoPrivateIpv4`] or [`Error::MachineIdFailed`] if machine-id
    ///   resolution fails
    /// - [`Error::MachineIdRejected`] if the validator declines the id
    pub fn build(self) -> Result<FloeGenerator<C>, Error> {
        if self.epoch > self.clock.now() {
            return Err(Error::FutureEpoch);
        }

        let machine_id = match &self.machine_id {
            Some(provider) => provider().map_err(Error::MachineIdFailed)?,
            None => lower_16_bit_private_ip()?,
        };

        if let Some(check) = &self.check_machine_id {
            if !check(machine_id) {
                return Err(Error::MachineIdRejected);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(machine_id, epoch_ms = self.epoch.as_millis() as u64, "generator configured");

        Ok(FloeGenerator::with_parts(self.epoch, machine_id, self.clock))
    }
}
