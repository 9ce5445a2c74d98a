//! Chip-wide state and register primitives of the `MCP23017` "16-Bit I/O Expander with Serial
//! Interface".
//!
//! A [`Device`] knows the bus address of the chip, the register layout it is in
//! ([`BankMode`]) and whether accesses are 8 or 16 bits wide ("toggle mode").  All
//! register traffic of both ports goes through it.
use crate::bus::I2cExt;
use crate::regs::{self, iocon, BankMode, Register};
use crate::{ConfigurationError, Error, InterruptLine, Parts, Port, SharedMutex};
use embedded_hal::i2c::{ErrorType, I2c};
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type of the I2C bus wrapped in `M`.
pub type BusError<M> = <<M as SharedMutex>::Inner as ErrorType>::Error;

/// Initial setup applied by [`Device::from_config()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 7-bit I2C address, `0x20..=0x27`.
    pub address: u8,
    /// Bank mode to switch to.  `None` leaves the chip alone and assumes `Bank0`.
    pub bank: Option<BankMode>,
    /// Switch to 16-bit register access.  Implies `Bank0`.
    pub toggle_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: 0x20,
            bank: None,
            toggle_mode: false,
        }
    }
}

impl Config {
    /// Default settings for the chip at `address`.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Switch to `bank` while creating the driver.
    pub fn bank(mut self, bank: BankMode) -> Self {
        self.bank = Some(bank);
        self
    }

    /// Enable 16-bit accesses while creating the driver.
    pub fn toggle_mode(mut self, enable: bool) -> Self {
        self.toggle_mode = enable;
        self
    }
}

/// Pin state registers read while servicing an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InterruptRegisters {
    pub flags: u8,
    pub captured: u8,
    pub level: u8,
}

/// One MCP23017 on a (possibly shared) I2C bus.
///
/// `M` is the mutex around the bus, see [`SharedMutex`].  The bank and toggle
/// mode are chip-wide and apply to every port created by [`Device::split()`].
pub struct Device<M> {
    bus: M,
    address: u8,
    bank1: AtomicBool,
    toggle: AtomicBool,
}

impl<I2C: I2c> Device<std::sync::Mutex<I2C>> {
    /// Create a driver for the chip with the given address pins, owning the bus.
    pub fn new(i2c: I2C, a0: bool, a1: bool, a2: bool) -> Self {
        Self::with_mutex(i2c, a0, a1, a2)
    }
}

impl<M> Device<M>
where
    M: SharedMutex,
    M::Inner: I2c,
{
    /// Create a driver for the chip with the given address pins, wrapping the bus in `M`.
    pub fn with_mutex(i2c: M::Inner, a0: bool, a1: bool, a2: bool) -> Self {
        let address = 0x20 | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8);
        Self::from_parts(M::create(i2c), address)
    }

    /// Use an already wrapped bus, e.g. an `Arc<Mutex<_>>` shared with other chips.
    pub fn with_bus(bus: M, address: u8) -> Result<Self, ConfigurationError> {
        if !(0x20..=0x27).contains(&address) {
            return Err(ConfigurationError::InvalidAddress(address));
        }
        Ok(Self::from_parts(bus, address))
    }

    /// Create the driver and bring the chip into the configured mode.
    pub fn from_config(bus: M, config: &Config) -> Result<Self, Error<BusError<M>>> {
        let dev = Self::with_bus(bus, config.address)?;
        if let Some(bank) = config.bank {
            dev.set_bank_mode(bank)?;
        }
        if config.toggle_mode {
            dev.enable_toggle_mode()?;
        }
        Ok(dev)
    }

    fn from_parts(bus: M, address: u8) -> Self {
        info!("Initialize MCP23017 on 0x{:02x}", address);
        Self {
            bus,
            address,
            bank1: AtomicBool::new(false),
            toggle: AtomicBool::new(false),
        }
    }

    /// 7-bit I2C address of the chip.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Register layout currently selected on the chip.
    pub fn bank_mode(&self) -> BankMode {
        if self.bank1.load(Ordering::Acquire) {
            BankMode::Bank1
        } else {
            BankMode::Bank0
        }
    }

    /// Whether register accesses are 16 bits wide.
    pub fn toggle_mode(&self) -> bool {
        self.toggle.load(Ordering::Acquire)
    }

    /// Physical address of `reg` for the port with the given prefix, in the current bank mode.
    pub fn register_address(&self, prefix: u8, reg: Register) -> u8 {
        let bank = self.bank_mode();
        regs::resolve(bank, prefix, reg.offset(bank))
    }

    /// Physical address of `reg` for port A (`0`) or port B (`1`).  The prefix
    /// is taken from the bank mode in effect right now.
    pub(crate) fn port_register_address(&self, port: usize, reg: Register) -> u8 {
        let bank = self.bank_mode();
        regs::resolve(bank, bank.prefixes()[port], reg.offset(bank))
    }

    /// Read a register.  In toggle mode the paired register is read as well and
    /// returned as the upper byte.
    pub fn read(&self, reg: u8) -> Result<u16, Error<BusError<M>>> {
        let value = self.bus.lock(|bus| self.read_locked(bus, reg))?;
        trace!(
            "Read 0x{:02x} register 0x{:02x} = 0x{:04x}",
            self.address,
            reg,
            value
        );
        Ok(value)
    }

    /// Write a register.  Outside of toggle mode only the lower byte of `value` is used.
    pub fn write(&self, reg: u8, value: u16) -> Result<(), Error<BusError<M>>> {
        trace!(
            "Write 0x{:02x} register 0x{:02x} = 0x{:04x}",
            self.address,
            reg,
            value
        );
        self.bus.lock(|bus| self.write_locked(bus, reg, value))
    }

    /// Set all bits of `mask` in `reg`.
    ///
    /// The read and the write-back happen under one lock of the bus mutex, but
    /// nothing stops another driver instance for the same chip from touching
    /// the register in between.  Finish configuration before enabling interrupts.
    pub fn set_bits(&self, reg: u8, mask: u16) -> Result<(), Error<BusError<M>>> {
        self.update_bits(reg, mask, 0)
    }

    /// Clear all bits of `mask` in `reg`.  See [`Device::set_bits()`].
    pub fn clear_bits(&self, reg: u8, mask: u16) -> Result<(), Error<BusError<M>>> {
        self.update_bits(reg, 0, mask)
    }

    fn update_bits(
        &self,
        reg: u8,
        mask_set: u16,
        mask_clear: u16,
    ) -> Result<(), Error<BusError<M>>> {
        self.bus.lock(|bus| {
            let before = self.read_locked(bus, reg)?;
            let after = (before | mask_set) & !mask_clear;
            debug!(
                "Register 0x{:02x}: 0b{:b} -> 0b{:b}",
                reg, before, after
            );
            self.write_locked(bus, reg, after)
        })
    }

    fn read_locked(&self, bus: &mut M::Inner, reg: u8) -> Result<u16, Error<BusError<M>>> {
        if self.toggle_mode() {
            let mut buf = [0x00; 2];
            bus.read_reg(self.address, reg, &mut buf)
                .map_err(Error::Bus)?;
            Ok(u16::from_le_bytes(buf))
        } else {
            let mut buf = [0x00; 1];
            bus.read_reg(self.address, reg, &mut buf)
                .map_err(Error::Bus)?;
            Ok(buf[0] as u16)
        }
    }

    fn write_locked(
        &self,
        bus: &mut M::Inner,
        reg: u8,
        value: u16,
    ) -> Result<(), Error<BusError<M>>> {
        let bytes = value.to_le_bytes();
        let bytes = if self.toggle_mode() {
            &bytes[..]
        } else {
            &bytes[..1]
        };
        bus.write_reg(self.address, reg, bytes).map_err(Error::Bus)
    }

    /// Switch the register layout.
    ///
    /// IOCON lives at a different address in either layout and the current
    /// layout of the chip cannot be trusted, so the new value is written to both
    /// locations.  This rewrites all of IOCON: the other configuration bits are
    /// cleared and toggle mode ends.
    ///
    /// Ports already created follow the new layout with their next access.
    pub fn set_bank_mode(&self, bank: BankMode) -> Result<(), Error<BusError<M>>> {
        let value = match bank {
            BankMode::Bank0 => 0x00,
            BankMode::Bank1 => iocon::BANK,
        };
        self.bus.lock(|bus| -> Result<(), Error<BusError<M>>> {
            bus.write_reg(self.address, regs::IOCON_BANK1, &[value])
                .map_err(Error::Bus)?;
            bus.write_reg(self.address, regs::IOCON_BANK0, &[value])
                .map_err(Error::Bus)?;
            Ok(())
        })?;
        self.toggle.store(false, Ordering::Release);
        self.bank1
            .store(bank == BankMode::Bank1, Ordering::Release);
        info!("Bank of 0x{:02x} set to {:?}", self.address, bank);
        Ok(())
    }

    /// Switch to 16-bit accesses: the address pointer toggles between the A/B
    /// register pair, so every read and write covers both ports.
    pub fn enable_toggle_mode(&self) -> Result<(), Error<BusError<M>>> {
        self.set_bank_mode(BankMode::Bank0)?;
        self.set_config(iocon::SEQOP)?;
        self.toggle.store(true, Ordering::Release);
        info!("0x{:02x} in toggle mode", self.address);
        Ok(())
    }

    pub fn disable_toggle_mode(&self) -> Result<(), Error<BusError<M>>> {
        self.clear_config(iocon::SEQOP)?;
        self.toggle.store(false, Ordering::Release);
        info!("0x{:02x} in byte mode", self.address);
        Ok(())
    }

    /// Set bits in IOCON, see [`iocon`](crate::regs::iocon).
    pub fn set_config(&self, flags: u8) -> Result<(), Error<BusError<M>>> {
        info!("Access IOCON of 0x{:02x}, adding: 0b{:08b}", self.address, flags);
        self.set_bits(self.iocon_address(), self.iocon_mask(flags))
    }

    /// Clear bits in IOCON, see [`iocon`](crate::regs::iocon).
    pub fn clear_config(&self, flags: u8) -> Result<(), Error<BusError<M>>> {
        info!("Access IOCON of 0x{:02x}, removing: 0b{:08b}", self.address, flags);
        self.clear_bits(self.iocon_address(), self.iocon_mask(flags))
    }

    fn iocon_address(&self) -> u8 {
        self.register_address(0, Register::Iocon)
    }

    // both bytes of a wide access hit IOCON
    fn iocon_mask(&self, flags: u8) -> u16 {
        if self.toggle_mode() {
            u16::from_le_bytes([flags, flags])
        } else {
            flags as u16
        }
    }

    /// Read all eleven registers of both ports, one byte each, in [`Register::ALL`] order.
    pub fn dump(&self) -> Result<[[u8; 11]; 2], Error<BusError<M>>> {
        let prefixes = self.bank_mode().prefixes();
        let mut out = [[0x00; 11]; 2];
        self.bus.lock(|bus| -> Result<(), Error<BusError<M>>> {
            for (port, prefix) in out.iter_mut().zip(prefixes) {
                for (value, reg) in port.iter_mut().zip(Register::ALL) {
                    let addr = self.register_address(prefix, reg);
                    bus.read_reg(self.address, addr, core::slice::from_mut(value))
                        .map_err(Error::Bus)?;
                }
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Read INTF, INTCAP and GPIO of one port in a single transaction.  Reading
    /// INTCAP and GPIO releases the interrupt output of the chip.
    pub(crate) fn read_interrupt_registers(
        &self,
        port: usize,
    ) -> Result<InterruptRegisters, Error<BusError<M>>> {
        let regs = [
            self.port_register_address(port, Register::Intf),
            self.port_register_address(port, Register::Intcap),
            self.port_register_address(port, Register::Gpio),
        ];
        let [flags, captured, level] = self
            .bus
            .lock(|bus| bus.read_regs(self.address, regs))
            .map_err(Error::Bus)?;
        Ok(InterruptRegisters {
            flags,
            captured,
            level,
        })
    }

    /// Create both ports.  Each interrupt line is configured with a pull-down
    /// right away, edge detection is armed when a callback is registered.
    pub fn split<L: InterruptLine>(
        self: &Arc<Self>,
        line_a: L,
        line_b: L,
    ) -> Result<Parts<M, L>, Error<BusError<M>>> {
        Ok(Parts {
            port_a: Port::new(self.clone(), 0, line_a)?,
            port_b: Port::new(self.clone(), 1, line_b)?,
        })
    }
}
