//! Driver for the MCP23017 16-bit I2C GPIO expander with interrupt-on-change servicing.
//!
//! The chip is represented by a [`Device`], which owns the bus handle and the
//! chip-wide addressing state.  [`Device::split()`] creates the two 8-pin
//! [`Port`]s.  Each port can be configured per pin or as a whole and delivers
//! pin changes to a user callback whenever the chip raises its interrupt line.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let dev = Arc::new(mcp23017_irq::Device::new(i2c, false, false, false));
//! let parts = dev.split(mcp23017_irq::Unwired, mcp23017_irq::Unwired).unwrap();
//! parts.port_a.set_port_direction(0xff).unwrap();
//! parts.port_a.set_port_interrupt(0xff).unwrap();
//! parts
//!     .port_a
//!     .register_callback(|changed, prefix, address| {
//!         println!("0x{:02x}/{}: 0b{:08b}", address, prefix, changed);
//!     })
//!     .unwrap();
//! ```

mod bus;
pub mod device;
mod error;
pub mod irq;
mod mutex;
pub mod port;
pub mod regs;

#[cfg(test)]
mod fake;

pub use device::{Config, Device};
pub use error::{ConfigurationError, Error};
pub use irq::{InterruptLine, Unwired};
pub use mutex::SharedMutex;
pub use port::{Direction, Parts, Port};
pub use regs::{iocon, BankMode, Register};
