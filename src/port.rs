//! One 8-pin half of the chip: configuration pass-throughs and interrupt servicing.
use crate::device::{BusError, Device};
use crate::regs::Register;
use crate::{ConfigurationError, Error, InterruptLine, SharedMutex};
use embedded_hal::i2c::I2c;
use log::{debug, error};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LockResult, Mutex, MutexGuard, RwLock};

/// Receives `(changed_pins, port_prefix, device_address)` after each interrupt.
pub type Callback = dyn Fn(u8, u8, u8) + Send + Sync;
/// Receives the number of interrupts serviced until the port returned to all-zero.
pub type AccuracyCallback = dyn Fn(u32) + Send + Sync;

/// Direction of a single pin, see [`Port::set_pin_direction()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Both ports of a chip, see [`Device::split()`].
pub struct Parts<M, L> {
    pub port_a: Arc<Port<M, L>>,
    pub port_b: Arc<Port<M, L>>,
}

struct Line<L> {
    line: L,
    armed: bool,
}

/// One port of an MCP23017.
///
/// Configuration methods come in two forms: `set_port_*()` replaces the setting of
/// all 8 pins at once, `set_pin_*()` changes a single pin with a read-modify-write.
///
/// For interrupts, the port keeps the pin levels seen at the last service.  Each
/// service reports the pins that are newly asserted compared to that snapshot.
pub struct Port<M, L> {
    device: Arc<Device<M>>,
    /// 0 for port A, 1 for port B.
    index: usize,
    state: Mutex<u8>,
    callback: RwLock<Option<Arc<Callback>>>,
    accuracy: AtomicU32,
    accuracy_callback: RwLock<Option<Arc<AccuracyCallback>>>,
    line: Mutex<Line<L>>,
}

fn unpoison<G>(r: LockResult<G>) -> G {
    r.unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn pin_mask(pin: u8) -> Result<u8, ConfigurationError> {
    if pin > 7 {
        return Err(ConfigurationError::InvalidPin(pin));
    }
    Ok(1 << pin)
}

/// Pins newly asserted relative to `cached`, and the snapshot to keep.
///
/// The flags of the interrupt are merged with the live pin level while the
/// snapshot is the pin level alone.
pub(crate) fn edge_delta(cached: u8, flags: u8, level: u8) -> (u8, u8) {
    (!cached & (flags | level), level)
}

impl<M, L> Port<M, L>
where
    M: SharedMutex,
    M::Inner: I2c,
    L: InterruptLine,
{
    pub(crate) fn new(
        device: Arc<Device<M>>,
        index: usize,
        mut line: L,
    ) -> Result<Arc<Self>, Error<BusError<M>>> {
        debug!("Initialize port {} of 0x{:02x}", index, device.address());
        line.set_pull_down().map_err(Error::line)?;
        Ok(Arc::new(Self {
            device,
            index,
            state: Mutex::new(0x00),
            callback: RwLock::new(None),
            accuracy: AtomicU32::new(0),
            accuracy_callback: RwLock::new(None),
            line: Mutex::new(Line { line, armed: false }),
        }))
    }
}

impl<M, L> Port<M, L>
where
    M: SharedMutex,
    M::Inner: I2c,
{
    /// Address fragment selecting this port's registers in the current bank mode.
    pub fn prefix(&self) -> u8 {
        self.device.bank_mode().prefixes()[self.index]
    }

    /// The chip this port belongs to.
    pub fn device(&self) -> &Arc<Device<M>> {
        &self.device
    }

    /// Pin levels as of the last completed interrupt service (or resync).
    pub fn cached_state(&self) -> u8 {
        *self.lock_state()
    }

    /// Interrupts serviced since the port state last returned to all-zero.
    pub fn accuracy(&self) -> u32 {
        self.accuracy.load(Ordering::Acquire)
    }

    fn lock_state(&self) -> MutexGuard<'_, u8> {
        unpoison(self.state.lock())
    }

    fn reg(&self, reg: Register) -> u8 {
        self.device.port_register_address(self.index, reg)
    }

    fn write_reg(&self, reg: Register, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.device.write(self.reg(reg), mask as u16)
    }

    fn update_pin(&self, reg: Register, pin: u8, set: bool) -> Result<(), Error<BusError<M>>> {
        let mask = pin_mask(pin)? as u16;
        if set {
            self.device.set_bits(self.reg(reg), mask)
        } else {
            self.device.clear_bits(self.reg(reg), mask)
        }
    }

    /// IODIR for all pins, a 1 makes the pin an input.
    pub fn set_port_direction(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Iodir, mask)
    }

    /// IODIR for one pin.
    pub fn set_pin_direction(&self, pin: u8, dir: Direction) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Iodir, pin, dir == Direction::Input)
    }

    /// GPPU for all pins.
    pub fn set_port_pull_up(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Gppu, mask)
    }

    /// GPPU for one pin.
    pub fn set_pin_pull_up(&self, pin: u8, enable: bool) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Gppu, pin, enable)
    }

    /// IPOL for all pins, a 1 inverts the reported input level.
    pub fn set_port_polarity(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Ipol, mask)
    }

    /// IPOL for one pin.
    pub fn set_pin_polarity(&self, pin: u8, inverted: bool) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Ipol, pin, inverted)
    }

    /// GPINTEN for all pins.
    pub fn set_port_interrupt(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Gpinten, mask)
    }

    /// GPINTEN for one pin.
    pub fn set_pin_interrupt(&self, pin: u8, enable: bool) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Gpinten, pin, enable)
    }

    /// INTCON for all pins: a 1 compares against DEFVAL instead of the previous level.
    pub fn set_port_interrupt_compare(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Intcon, mask)
    }

    /// INTCON for one pin.
    pub fn set_pin_interrupt_compare(
        &self,
        pin: u8,
        enable: bool,
    ) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Intcon, pin, enable)
    }

    /// DEFVAL for all pins.
    pub fn set_port_default_value(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Defval, mask)
    }

    /// DEFVAL for one pin.
    pub fn set_pin_default_value(&self, pin: u8, high: bool) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Defval, pin, high)
    }

    /// Drive all output pins.
    ///
    /// In toggle mode this is a 16-bit write: the paired port's latches are set to 0.
    pub fn write_port(&self, mask: u8) -> Result<(), Error<BusError<M>>> {
        self.write_reg(Register::Olat, mask)
    }

    /// Drive one output pin.
    pub fn write_pin(&self, pin: u8, high: bool) -> Result<(), Error<BusError<M>>> {
        self.update_pin(Register::Olat, pin, high)
    }

    /// Current level of all pins.
    pub fn read_port(&self) -> Result<u8, Error<BusError<M>>> {
        let [low, _] = self.device.read(self.reg(Register::Gpio))?.to_le_bytes();
        Ok(low)
    }

    /// Current level of one pin.
    pub fn read_pin(&self, pin: u8) -> Result<bool, Error<BusError<M>>> {
        let mask = pin_mask(pin)?;
        Ok(self.read_port()? & mask != 0)
    }

    /// Replace the cached state with the current pin levels.
    pub fn resync(&self) -> Result<u8, Error<BusError<M>>> {
        let mut state = self.lock_state();
        *state = self.read_port()?;
        debug!(
            "Initial state of port 0x{:x} is now 0b{:08b}",
            self.prefix(),
            *state
        );
        Ok(*state)
    }

    /// Report the interrupt statistics to `f`, see [`Port::accuracy()`].
    pub fn set_accuracy_callback<F>(&self, f: F)
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        *unpoison(self.accuracy_callback.write()) = Some(Arc::new(f));
    }

    /// Handle one interrupt of this port and return the changed pins.
    ///
    /// This is what the armed interrupt line runs on each rising edge.  It can
    /// also be called directly when interrupts are detected some other way.
    ///
    /// Services of the same port are serialized; the registered callback runs
    /// after the port is released again, so it may use the port freely.
    pub fn service(&self) -> Result<u8, Error<BusError<M>>> {
        debug!(
            "Interrupt on 0x{:02x} with prefix 0x{:x}",
            self.device.address(),
            self.prefix()
        );
        let (changed, state) = {
            let mut cached = self.lock_state();
            let regs = self.device.read_interrupt_registers(self.index)?;
            debug!(
                "INTF 0b{:08b} INTCAP 0b{:08b} GPIO 0b{:08b}",
                regs.flags, regs.captured, regs.level
            );
            let (changed, next) = edge_delta(*cached, regs.flags, regs.level);
            debug!("State 0b{:08b} -> 0b{:08b}", *cached, next);
            *cached = next;
            (changed, next)
        };

        let callback = unpoison(self.callback.read()).clone();
        if let Some(callback) = callback {
            debug!("Sending changes 0b{:08b} to callback", changed);
            callback(changed, self.prefix(), self.device.address());
        }

        let report = unpoison(self.accuracy_callback.read()).clone();
        if let Some(report) = report {
            self.accuracy.fetch_add(1, Ordering::AcqRel);
            if state == 0 {
                report(self.accuracy.swap(0, Ordering::AcqRel));
            }
        }
        Ok(changed)
    }
}

impl<M, L> Port<M, L>
where
    M: SharedMutex + Send + Sync + 'static,
    M::Inner: I2c,
    L: InterruptLine + Send + 'static,
{
    /// Deliver pin changes to `f`, replacing any earlier callback.
    ///
    /// The cached state is re-read from the chip first so the next interrupt is
    /// compared against the real pin levels.  The first registration arms edge
    /// detection on the interrupt line.
    pub fn register_callback<F>(self: &Arc<Self>, f: F) -> Result<(), Error<BusError<M>>>
    where
        F: Fn(u8, u8, u8) + Send + Sync + 'static,
    {
        self.resync()?;
        *unpoison(self.callback.write()) = Some(Arc::new(f));

        let mut line = unpoison(self.line.lock());
        if !line.armed {
            debug!("Arming interrupt line of port 0x{:x}", self.prefix());
            let port = Arc::downgrade(self);
            line.line
                .on_rising_edge(Box::new(move || {
                    let Some(port) = port.upgrade() else {
                        return;
                    };
                    if let Err(e) = port.service() {
                        error!(
                            "Servicing port 0x{:x} of 0x{:02x} failed: {}",
                            port.prefix(),
                            port.device.address(),
                            e
                        );
                    }
                }))
                .map_err(Error::line)?;
            line.armed = true;
        }
        Ok(())
    }
}
