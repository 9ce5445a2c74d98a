use embedded_hal::i2c::{I2c, Operation};

/// Register-level access on top of the raw `I2c` trait.
pub(crate) trait I2cExt {
    type Error;

    /// Write `value` (one byte, or two in toggle mode) starting at `reg`.
    fn write_reg(&mut self, addr: u8, reg: u8, value: &[u8]) -> Result<(), Self::Error>;
    /// Fill `buf` starting at `reg`, relying on the chip's address pointer.
    fn read_reg(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
    /// Read one byte from each of `regs` in a single transaction.
    fn read_regs(&mut self, addr: u8, regs: [u8; 3]) -> Result<[u8; 3], Self::Error>;
}

impl<I2C: I2c> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg(&mut self, addr: u8, reg: u8, value: &[u8]) -> Result<(), Self::Error> {
        debug_assert!(value.len() <= 2);
        let mut buf = [reg, 0x00, 0x00];
        buf[1..=value.len()].copy_from_slice(value);
        self.write(addr, &buf[..=value.len()])
    }

    fn read_reg(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.write_read(addr, &[reg], buf)
    }

    fn read_regs(&mut self, addr: u8, regs: [u8; 3]) -> Result<[u8; 3], Self::Error> {
        let mut out = [[0x00; 1]; 3];
        let [a, b, c] = &mut out;
        self.transaction(
            addr,
            &mut [
                Operation::Write(&regs[0..1]),
                Operation::Read(a),
                Operation::Write(&regs[1..2]),
                Operation::Read(b),
                Operation::Write(&regs[2..3]),
                Operation::Read(c),
            ],
        )?;
        Ok([out[0][0], out[1][0], out[2][0]])
    }
}
