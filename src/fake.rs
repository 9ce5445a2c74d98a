//! Register-file model of the chip for tests that care about state rather than
//! exact bus traffic.
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub(crate) struct Chip {
    pub regs: [u8; 0x20],
    pub iocon: u8,
    pointer: u8,
    /// Values loaded into INTF/GPIO of `(intf_addr, gpio_addr)` whenever the
    /// pointer is set to `intf_addr`, one entry per access.
    pub script: VecDeque<(u8, u8, [u8; 2])>,
    pub transactions: usize,
}

impl Chip {
    fn bank1(&self) -> bool {
        self.iocon & crate::regs::iocon::BANK != 0
    }

    fn is_iocon(&self, p: u8) -> Option<[u8; 2]> {
        let aliases = if self.bank1() { [0x05, 0x15] } else { [0x0a, 0x0b] };
        aliases.contains(&p).then_some(aliases)
    }

    fn advance(&mut self) {
        let seqop = self.iocon & crate::regs::iocon::SEQOP != 0;
        self.pointer = match (seqop, self.bank1()) {
            (true, false) => self.pointer ^ 1,
            (true, true) => self.pointer,
            (false, _) => (self.pointer + 1) % 0x20,
        };
    }

    fn set_pointer(&mut self, p: u8) {
        self.pointer = p;
        let hit = self.script.front().is_some_and(|(intf, _, _)| *intf == p);
        if hit {
            if let Some((intf, gpio, [f, g])) = self.script.pop_front() {
                self.regs[intf as usize] = f;
                self.regs[gpio as usize] = g;
            }
        }
    }

    fn put(&mut self, b: u8) {
        match self.is_iocon(self.pointer) {
            Some(aliases) => {
                self.iocon = b;
                for a in aliases {
                    self.regs[a as usize] = b;
                }
            }
            None => self.regs[self.pointer as usize] = b,
        }
        self.advance();
    }

    fn get(&mut self) -> u8 {
        let b = self.regs[self.pointer as usize];
        self.advance();
        b
    }
}

/// Cheap to clone; all clones share the same chip.
#[derive(Clone, Default)]
pub(crate) struct FakeChip {
    pub chip: Arc<Mutex<Chip>>,
    pub fail: Arc<AtomicBool>,
    pub latency: Option<Duration>,
}

impl FakeChip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Chip) -> R) -> R {
        f(&mut self.chip.lock().unwrap())
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.with(|c| c.regs[addr as usize])
    }

    pub fn set_reg(&self, addr: u8, v: u8) {
        self.with(|c| c.regs[addr as usize] = v)
    }
}

impl ErrorType for FakeChip {
    type Error = ErrorKind;
}

impl I2c for FakeChip {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ErrorKind::Other);
        }
        if let Some(d) = self.latency {
            std::thread::sleep(d);
        }
        let mut chip = self.chip.lock().unwrap();
        chip.transactions += 1;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some((reg, rest)) = bytes.split_first() {
                        chip.set_pointer(*reg);
                        for b in rest {
                            chip.put(*b);
                        }
                    }
                }
                Operation::Read(buf) => {
                    for b in buf.iter_mut() {
                        *b = chip.get();
                    }
                }
            }
        }
        Ok(())
    }
}
