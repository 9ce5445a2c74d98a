//! Host-side interrupt lines.
//!
//! The chip signals pending pin changes on its INTA/INTB outputs.  Those are wired
//! to GPIOs of the host, which has to notice the rising edge and call
//! [`Port::service()`](crate::Port::service).  Two ways of doing that exist:
//!
//! 1. Callback style: implement [`InterruptLine`] for the host GPIO and pass it to
//!    [`Device::split()`](crate::Device::split).  Registering a callback on the
//!    port arms the line, the host then runs the handler on its own thread.
//! 2. Async style (`"async"` feature): pass [`Unwired`] to `split()` and drive
//!    the port with [`Port::run()`](crate::Port::run) from a task, using any pin
//!    implementing `embedded_hal_async::digital::Wait`.
use embedded_hal::digital::ErrorType;

/// A host GPIO connected to one of the chip's interrupt outputs.
pub trait InterruptLine: ErrorType {
    /// Configure the line as an input with pull-down bias.
    fn set_pull_down(&mut self) -> Result<(), Self::Error>;

    /// Run `handler` on every rising edge, from whatever context the host
    /// delivers edge events in.  Called at most once per line.
    fn on_rising_edge(
        &mut self,
        handler: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Result<(), Self::Error>;
}

/// Interrupt line that is not connected, or serviced some other way.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unwired;

impl ErrorType for Unwired {
    type Error = core::convert::Infallible;
}

impl InterruptLine for Unwired {
    fn set_pull_down(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn on_rising_edge(
        &mut self,
        _handler: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(feature = "async")]
mod run {
    use crate::device::BusError;
    use crate::{Error, Port, SharedMutex};
    use embedded_hal::i2c::I2c;
    use embedded_hal_async::digital::Wait;

    impl<M, L> Port<M, L>
    where
        M: SharedMutex,
        M::Inner: I2c,
    {
        /// Service this port on every rising edge of `line`.
        ///
        /// The cached state is resynchronized first.  Only returns when the bus
        /// or the line fails.
        pub async fn run<W: Wait>(
            &self,
            mut line: W,
        ) -> Result<core::convert::Infallible, Error<BusError<M>>> {
            self.resync()?;
            loop {
                line.wait_for_rising_edge().await.map_err(Error::line)?;
                self.service()?;
            }
        }
    }
}
