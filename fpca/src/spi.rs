//! The FPCA's byte-at-a-time SPI master.
//!
//! Register map, one word each:
//!
//! - `0x0`: data. Writing starts an exchange of one byte; reading clocks out
//!   `0xFF` and returns what came back.
//! - `0x4`: chip select, active low.
//! - `0x8`: throttle, the number of system clocks between SPI clock edges.
//!
//! Both data accesses stall the bus until the exchange completes, so there's
//! no status to poll.

use crate::reg::Reg;

const DATA: usize = 0;
const CSN: usize = 1;
const THROTTLE: usize = 2;

/// What the SD card and PSRAM drivers need from an SPI master.
pub trait SpiMaster {
    /// Asserts chip select.
    fn select(&mut self);
    /// Deasserts chip select.
    fn deselect(&mut self);
    fn write_byte(&mut self, byte: u8);
    fn read_byte(&mut self) -> u8;
    fn set_throttle(&mut self, throttle: u8);

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) {
        for b in buf {
            *b = self.read_byte();
        }
    }
}

pub struct Spi {
    base: Reg,
}

impl Spi {
    /// # Safety
    ///
    /// `base` must be the address of an SPI master register block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    fn reg(&self, index: usize) -> Reg {
        unsafe { self.base.offset(index) }
    }
}

impl SpiMaster for Spi {
    fn select(&mut self) {
        self.reg(CSN).write(0);
    }

    fn deselect(&mut self) {
        self.reg(CSN).write(1);
    }

    fn write_byte(&mut self, byte: u8) {
        self.reg(DATA).write(u32::from(byte));
    }

    fn read_byte(&mut self) -> u8 {
        self.reg(DATA).read() as u8
    }

    fn set_throttle(&mut self, throttle: u8) {
        self.reg(THROTTLE).write(u32::from(throttle));
    }
}
