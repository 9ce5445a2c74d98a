//! Register map of the MCP23017 and physical address resolution.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! The chip exposes eleven registers per port.  Where they live depends on
//! `IOCON.BANK`:
//!
//! - `BANK=0` (reset state): the A and B registers of each kind are paired at
//!   consecutive addresses, so offsets are spaced by 2 and port B sits one
//!   address above port A.
//! - `BANK=1`: each port has its own contiguous 11-register block, port A at
//!   `0x00` and port B at `0x10`.
use crate::ConfigurationError;

/// Chip-wide register layout selected by `IOCON.BANK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BankMode {
    /// Registers of both ports interleaved (reset state).
    #[default]
    Bank0,
    /// Registers of each port in a separate block.
    Bank1,
}

impl TryFrom<u8> for BankMode {
    type Error = ConfigurationError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(BankMode::Bank0),
            1 => Ok(BankMode::Bank1),
            other => Err(ConfigurationError::InvalidBankMode(other)),
        }
    }
}

impl BankMode {
    /// Address prefix of port A and port B in this bank mode.
    pub const fn prefixes(self) -> [u8; 2] {
        match self {
            BankMode::Bank0 => [0x00, 0x01],
            BankMode::Bank1 => [0x00, 0x10],
        }
    }
}

/// Logical registers, the same set exists once per port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// IODIR: input/output direction: 0=output; 1=input
    Iodir,
    /// IPOL: input polarity: 0=register values match input pins; 1=opposite
    Ipol,
    /// GPINTEN: interrupt-on-change: 0=disable; 1=enable
    Gpinten,
    /// DEFVAL: default values for interrupt-on-change
    Defval,
    /// INTCON: interrupt-on-change config: 0=compare to previous pin value;
    ///   1=compare to corresponding bit in DEFVAL
    Intcon,
    /// IOCON: configuration register, shared by both ports (see [`iocon`])
    Iocon,
    /// GPPU: weak internal pull-ups on pins configured as inputs
    Gppu,
    /// INTF: interrupt flags: 1=corresponding pin caused interrupt
    Intf,
    /// INTCAP: pin values captured when the interrupt occurred; reading clears
    ///   the interrupt
    Intcap,
    /// GPIO: reflects logic level on pins
    Gpio,
    /// OLAT: output latches
    Olat,
}

impl Register {
    pub const ALL: [Register; 11] = [
        Register::Iodir,
        Register::Ipol,
        Register::Gpinten,
        Register::Defval,
        Register::Intcon,
        Register::Iocon,
        Register::Gppu,
        Register::Intf,
        Register::Intcap,
        Register::Gpio,
        Register::Olat,
    ];

    /// Offset of this register within the layout of `bank`.
    ///
    /// In `Bank0` the offsets are twice the `Bank1` ones.
    pub const fn offset(self, bank: BankMode) -> u8 {
        let index = self as u8;
        match bank {
            BankMode::Bank0 => index * 2,
            BankMode::Bank1 => index,
        }
    }
}

/// Combine a port prefix and a register offset into the address put on the bus.
pub const fn resolve(bank: BankMode, prefix: u8, offset: u8) -> u8 {
    match bank {
        BankMode::Bank0 => prefix + offset,
        BankMode::Bank1 => prefix | offset,
    }
}

/// Physical address of IOCON in either bank layout (port B alias for bank 1).
/// A bank transition writes both since the current layout of the chip is not
/// known for sure.
pub(crate) const IOCON_BANK0: u8 = 0x0a;
pub(crate) const IOCON_BANK1: u8 = 0x15;

/// Bits of the IOCON register.
pub mod iocon {
    /// Register layout select, see [`BankMode`](super::BankMode).
    pub const BANK: u8 = 0b1000_0000;
    /// INTA and INTB are internally ORed.
    pub const MIRROR: u8 = 0b0100_0000;
    /// Disables sequential address increments.  With `BANK=0` the address
    /// pointer then toggles between the A/B register pair.
    pub const SEQOP: u8 = 0b0010_0000;
    /// Disables SDA slew-rate control.
    pub const DISSLW: u8 = 0b0001_0000;
    /// Hardware address enable (MCP23S17 only).
    pub const HAEN: u8 = 0b0000_1000;
    /// Interrupt pins are open-drain outputs (overrides INTPOL).
    pub const ODR: u8 = 0b0000_0100;
    /// Interrupt pins are active-high.
    pub const INTPOL: u8 = 0b0000_0010;
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK0_A: [u8; 11] = [
        0x00, 0x02, 0x04, 0x06, 0x08, 0x0a, 0x0c, 0x0e, 0x10, 0x12, 0x14,
    ];
    const BANK1_A: [u8; 11] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a,
    ];

    fn table(bank: BankMode) -> Vec<u8> {
        bank.prefixes()
            .iter()
            .flat_map(|&prefix| {
                Register::ALL
                    .iter()
                    .map(move |r| resolve(bank, prefix, r.offset(bank)))
            })
            .collect()
    }

    #[test]
    fn bank0_layout() {
        let t = table(BankMode::Bank0);
        assert_eq!(&t[..11], &BANK0_A);
        let b: Vec<u8> = BANK0_A.iter().map(|a| a + 1).collect();
        assert_eq!(&t[11..], &b[..]);
        assert_eq!(
            resolve(BankMode::Bank0, 0, Register::Iocon.offset(BankMode::Bank0)),
            IOCON_BANK0
        );
    }

    #[test]
    fn bank1_layout() {
        let t = table(BankMode::Bank1);
        assert_eq!(&t[..11], &BANK1_A);
        let b: Vec<u8> = BANK1_A.iter().map(|a| a | 0x10).collect();
        assert_eq!(&t[11..], &b[..]);
        assert_eq!(
            resolve(BankMode::Bank1, 0x10, Register::Olat.offset(BankMode::Bank1)),
            0x1a
        );
    }

    #[test]
    fn resolution_is_injective() {
        for bank in [BankMode::Bank0, BankMode::Bank1] {
            let mut t = table(bank);
            assert_eq!(t.len(), 2 * Register::ALL.len());
            t.sort_unstable();
            t.dedup();
            assert_eq!(t.len(), 2 * Register::ALL.len(), "{:?}", bank);
        }
    }

    #[test]
    fn iocon_locations() {
        // IOCON is shared by both ports, the B address is an alias.
        assert_eq!(
            resolve(BankMode::Bank1, 0x10, Register::Iocon.offset(BankMode::Bank1)),
            IOCON_BANK1
        );
        // In bank 0 that same address is OLATB.
        assert_eq!(
            resolve(BankMode::Bank0, 1, Register::Olat.offset(BankMode::Bank0)),
            IOCON_BANK1
        );
    }

    #[test]
    fn bank_mode_from_raw() {
        assert_eq!(BankMode::try_from(0), Ok(BankMode::Bank0));
        assert_eq!(BankMode::try_from(1), Ok(BankMode::Bank1));
        assert_eq!(
            BankMode::try_from(2),
            Err(ConfigurationError::InvalidBankMode(2))
        );
    }
}
