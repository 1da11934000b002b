//! The Zynq processing system's UART0 (a Cadence UART), reachable from the
//! FPCA on the Pynq-Z2 through the PS's general-purpose slave port.
//!
//! We leave it at its reset baud rate (115200) and only use it for debug
//! output.

use crate::reg::Reg;
use crate::uart::ByteIo;

const CR: usize = 0x00 / 4;
const SR: usize = 0x2C / 4;
const FIFO: usize = 0x30 / 4;

/// Enable TX and RX, soft-reset both FIFOs.
const CR_ENABLE_AND_RESET: u32 = 0x0000_0117;

const SR_RXEMPTY: u32 = 1 << 1;
const SR_TXFULL: u32 = 1 << 4;

pub struct ZynqUart {
    base: Reg,
}

impl ZynqUart {
    /// # Safety
    ///
    /// `base` must be the address of a Cadence UART register block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    fn reg(&self, index: usize) -> Reg {
        unsafe { self.base.offset(index) }
    }

    pub fn setup(&mut self) {
        self.reg(CR).write(CR_ENABLE_AND_RESET);
    }
}

impl ByteIo for ZynqUart {
    fn write_byte(&mut self, byte: u8) {
        while self.reg(SR).read() & SR_TXFULL != 0 {
            // spin
        }
        self.reg(FIFO).write(u32::from(byte));
    }

    fn try_read_byte(&mut self) -> Option<u8> {
        if self.reg(SR).read() & SR_RXEMPTY != 0 {
            None
        } else {
            Some(self.reg(FIFO).read() as u8)
        }
    }
}
