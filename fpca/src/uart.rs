//! The FPCA UART.
//!
//! Five registers, one word apart: TX byte, TX idle, baud divisor, RX byte and
//! RX valid. There's no FIFO on either side: a byte sent while the
//! transmitter is busy is lost, and so is a received byte we don't collect
//! before the next one lands.

use core::convert::Infallible;

use ufmt::derive::uDebug;

use crate::platform::REFCLK_HZ;
use crate::reg::Reg;

const TX_BYTE: usize = 0;
const TX_IDLE: usize = 1;
const DIVISOR: usize = 2;
const RX_BYTE: usize = 3;
const RX_VALID: usize = 4;

/// A blocking byte stream.
///
/// Implemented by both UARTs we know how to drive; the bootloader and demos
/// are written against this so they don't care which one they get.
pub trait ByteIo {
    fn write_byte(&mut self, byte: u8);

    /// Returns a received byte, if one is waiting.
    fn try_read_byte(&mut self) -> Option<u8>;

    /// Waits for and returns the next received byte.
    fn read_byte(&mut self) -> u8 {
        loop {
            if let Some(b) = self.try_read_byte() {
                return b;
            }
        }
    }

    /// Waits until everything written has left the transmitter.
    fn flush(&mut self) {}

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_byte(b);
        }
    }

    /// Writes `s` followed by CR LF (the CR keeps PuTTY happy).
    fn puts(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_bytes(b"\r\n");
    }

    /// Receives a 32-bit word, least significant byte first.
    fn read_u32_le(&mut self) -> u32 {
        let mut word = u32::from(self.read_byte());
        word |= u32::from(self.read_byte()) << 8;
        word |= u32::from(self.read_byte()) << 16;
        word |= u32::from(self.read_byte()) << 24;
        word
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum BaudError {
    /// Rate was zero or too fast for the reference clock to divide down to.
    Unreachable,
}

/// Computes the baud divisor for `rate` from the reference clock.
pub fn baud_divisor(refclk_hz: u32, rate: u32) -> Result<u32, BaudError> {
    match refclk_hz.checked_div(rate) {
        Some(d) if d > 0 => Ok(d),
        _ => Err(BaudError::Unreachable),
    }
}

pub struct Uart {
    base: Reg,
}

impl Uart {
    /// # Safety
    ///
    /// `base` must be the address of an FPCA UART register block, and nothing
    /// else may drive that UART while this exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    fn reg(&self, index: usize) -> Reg {
        // Safety: all our register indices are within the block promised by
        // the caller of `new`.
        unsafe { self.base.offset(index) }
    }

    pub fn set_baud(&mut self, rate: u32) -> Result<(), BaudError> {
        let divisor = baud_divisor(REFCLK_HZ, rate)?;
        self.reg(DIVISOR).write(divisor);
        Ok(())
    }

    pub fn tx_ready(&self) -> bool {
        self.reg(TX_IDLE).read() != 0
    }

    pub fn rx_valid(&self) -> bool {
        self.reg(RX_VALID).read() != 0
    }

    pub fn put_char(&mut self, c: u8) {
        while !self.tx_ready() {
            // spin
        }
        self.reg(TX_BYTE).write(u32::from(c));
    }

    // TODO: the RX register has a frame error bit we could report here.
    pub fn get_char(&mut self) -> u8 {
        while !self.rx_valid() {
            // spin
        }
        self.reg(RX_BYTE).read() as u8
    }
}

impl ByteIo for Uart {
    fn write_byte(&mut self, byte: u8) {
        self.put_char(byte);
    }

    fn try_read_byte(&mut self) -> Option<u8> {
        if self.rx_valid() {
            Some(self.reg(RX_BYTE).read() as u8)
        } else {
            None
        }
    }

    fn read_byte(&mut self) -> u8 {
        self.get_char()
    }

    fn flush(&mut self) {
        while !self.tx_ready() {
            // spin
        }
    }
}

impl ufmt::uWrite for Uart {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        for b in s.bytes() {
            if b == b'\n' {
                self.put_char(b'\r');
            }
            self.put_char(b);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use super::ByteIo;

    /// A byte stream with scripted input that records its output.
    #[derive(Default)]
    pub struct ScriptedIo {
        pub input: VecDeque<u8>,
        pub output: Vec<u8>,
    }

    impl ScriptedIo {
        pub fn with_input(bytes: &[u8]) -> Self {
            Self {
                input: bytes.iter().copied().collect(),
                output: Vec::new(),
            }
        }
    }

    impl ByteIo for ScriptedIo {
        fn write_byte(&mut self, byte: u8) {
            self.output.push(byte);
        }

        fn try_read_byte(&mut self) -> Option<u8> {
            self.input.pop_front()
        }

        fn read_byte(&mut self) -> u8 {
            self.input.pop_front().expect("device read past end of script")
        }
    }
}
