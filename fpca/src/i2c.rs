//! Bit-banged I2C master, write only.
//!
//! The bus is driven from two output registers with fixed delays in between.
//! There's no input path, so there is no clock stretching, no ACK checking,
//! and no way to read.

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};
use ufmt::derive::uDebug;

/// Quarter of a 100 kHz clock period.
pub const QUARTER_PERIOD_NS: u32 = 2_500;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum I2cError {
    /// A read was requested; this bus can only write.
    ReadUnsupported,
}

impl i2c::Error for I2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct BitBangI2c<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    quarter_ns: u32,
}

impl<SCL, SDA, D> BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin<Error = Infallible>,
    SDA: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    pub fn new(scl: SCL, sda: SDA, delay: D) -> Self {
        Self::with_quarter_period(scl, sda, delay, QUARTER_PERIOD_NS)
    }

    pub fn with_quarter_period(scl: SCL, sda: SDA, delay: D, quarter_ns: u32) -> Self {
        Self { scl, sda, delay, quarter_ns }
    }

    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    fn quarter(&mut self) {
        self.delay.delay_ns(self.quarter_ns);
    }

    fn period(&mut self) {
        self.delay.delay_ns(self.quarter_ns * 4);
    }

    fn scl(&mut self, high: bool) {
        let r = if high { self.scl.set_high() } else { self.scl.set_low() };
        r.unwrap_or_else(|e| match e {})
    }

    fn sda(&mut self, high: bool) {
        let r = if high { self.sda.set_high() } else { self.sda.set_low() };
        r.unwrap_or_else(|e| match e {})
    }

    /// START: SDA falls while SCL is high.
    pub fn start(&mut self) {
        self.scl(true);
        self.sda(true);
        self.period();
        self.sda(false);
        self.period();
    }

    /// Clocks out `data` MSB first, followed by one ACK clock with SDA
    /// released. Leaves SCL and SDA low.
    pub fn write_byte(&mut self, data: u8) {
        self.scl(false);
        for i in (0..8).rev() {
            self.quarter();
            self.sda(data & (1 << i) != 0);
            self.quarter();
            self.scl(true);
            self.quarter();
            self.quarter();
            self.scl(false);
        }
        // ACK clock. Whatever the target says, we can't hear it.
        self.quarter();
        self.sda(true);
        self.quarter();
        self.scl(true);
        self.quarter();
        self.quarter();
        self.scl(false);
        self.quarter();
        self.sda(false);
        self.quarter();
    }

    /// STOP: SDA rises while SCL is high.
    pub fn stop(&mut self) {
        self.sda(false);
        self.scl(true);
        self.period();
        self.sda(true);
        self.period();
    }
}

impl<SCL, SDA, D> ErrorType for BitBangI2c<SCL, SDA, D> {
    type Error = I2cError;
}

impl<SCL, SDA, D> I2c<SevenBitAddress> for BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin<Error = Infallible>,
    SDA: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), I2cError> {
        if operations.iter().any(|op| matches!(op, Operation::Read(_))) {
            return Err(I2cError::ReadUnsupported);
        }
        self.start();
        self.write_byte(address << 1);
        for op in operations.iter() {
            if let Operation::Write(bytes) = op {
                for &b in bytes.iter() {
                    self.write_byte(b);
                }
            }
        }
        self.stop();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{decode, traced_bus, Frame};
    use super::*;

    #[test]
    fn write_transaction_on_the_wire() {
        let (mut bus, trace) = traced_bus();
        bus.write(0x3C, &[0x00, 0xAF]).unwrap();

        assert_eq!(
            decode(&trace.borrow()),
            vec![
                Frame::Start,
                Frame::Byte(0x78, true),
                Frame::Byte(0x00, true),
                Frame::Byte(0xAF, true),
                Frame::Stop,
            ]
        );
    }

    #[test]
    fn sda_only_changes_with_scl_low_inside_a_byte() {
        let (mut bus, trace) = traced_bus();
        bus.start();
        let start_len = trace.borrow().len();
        bus.write_byte(0b1010_0101);
        let trace = trace.borrow();
        let mut scl = true;
        for &(line, level) in &trace[start_len..] {
            match line {
                testing::Line::Scl => scl = level,
                testing::Line::Sda => assert!(!scl, "SDA moved while SCL high"),
            }
        }
        // Byte ends with both lines low, ready for STOP.
        assert_eq!(trace.last(), Some(&(testing::Line::Sda, false)));
    }

    #[test]
    fn reads_are_refused_without_touching_the_bus() {
        let (mut bus, trace) = traced_bus();
        let mut buf = [0u8; 2];
        assert_eq!(bus.read(0x3C, &mut buf), Err(I2cError::ReadUnsupported));
        assert!(trace.borrow().is_empty());
    }
}
