//! The GPIO block: LEDs, seven-segment display, buttons, switches, and the two
//! single-bit outputs used for I2C.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bsp::Bsp;
use crate::get_bit;
use crate::reg::Reg;

const LED: usize = 0x000 / 4;
const SSEG: usize = 0x004 / 4;
const SCL: usize = 0x008 / 4;
const SDA: usize = 0x00C / 4;
const BTN: usize = 0x100 / 4;
const SW: usize = 0x104 / 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Button {
    Up,
    Left,
    Right,
    Down,
}

pub struct Gpio {
    base: Reg,
}

impl Gpio {
    /// # Safety
    ///
    /// `base` must be the address of the GPIO block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    fn reg(&self, index: usize) -> Reg {
        unsafe { self.base.offset(index) }
    }

    pub fn set_leds(&mut self, value: u32) {
        self.reg(LED).write(value);
    }

    /// Shows `value` in hex on the seven-segment display.
    pub fn set_sseg(&mut self, value: u32) {
        self.reg(SSEG).write(value);
    }

    pub fn buttons(&self) -> u32 {
        self.reg(BTN).read()
    }

    pub fn switches(&self) -> u32 {
        self.reg(SW).read()
    }

    pub fn button_pressed<B: Bsp>(&self, button: Button) -> bool {
        get_bit(self.buttons(), B::button_bit(button)) != 0
    }

    pub fn switch(&self, n: u32) -> bool {
        get_bit(self.switches(), n) != 0
    }

    /// The SCL and SDA outputs, as pins.
    pub fn i2c_pins(&self) -> (RegPin, RegPin) {
        (RegPin(self.reg(SCL)), RegPin(self.reg(SDA)))
    }
}

/// An output pin backed by a whole register, of which only bit 0 matters.
pub struct RegPin(Reg);

impl RegPin {
    /// # Safety
    ///
    /// `addr` must be the address of a single-bit output register.
    pub const unsafe fn new(addr: usize) -> Self {
        Self(Reg::at(addr))
    }
}

impl ErrorType for RegPin {
    type Error = Infallible;
}

impl OutputPin for RegPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.write(0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.write(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::basys3;
    use crate::reg::testing::FakeRegs;

    #[test]
    fn buttons_map_through_bsp() {
        let mut regs = FakeRegs::new(0x108 / 4);
        let gpio = unsafe { Gpio::new(regs.base()) };
        regs.set(BTN, 0b0100);
        assert!(gpio.button_pressed::<basys3::Board>(Button::Left));
        assert!(!gpio.button_pressed::<basys3::Board>(Button::Right));
        assert!(!gpio.button_pressed::<basys3::Board>(Button::Up));
    }

    #[test]
    fn outputs_and_switches() {
        let mut regs = FakeRegs::new(0x108 / 4);
        let mut gpio = unsafe { Gpio::new(regs.base()) };
        gpio.set_leds(0xFFFF);
        gpio.set_sseg(0xc001);
        regs.set(SW, 1 << 15);
        assert_eq!(regs.get(LED), 0xFFFF);
        assert_eq!(regs.get(SSEG), 0xc001);
        assert!(gpio.switch(15));
        assert!(!gpio.switch(14));
    }

    #[test]
    fn i2c_pins_drive_their_registers() {
        let mut regs = FakeRegs::new(0x108 / 4);
        let gpio = unsafe { Gpio::new(regs.base()) };
        let (mut scl, mut sda) = gpio.i2c_pins();
        scl.set_high().unwrap();
        sda.set_high().unwrap();
        assert_eq!(regs.get(SCL), 1);
        assert_eq!(regs.get(SDA), 1);
        sda.set_low().unwrap();
        assert_eq!(regs.get(SCL), 1);
        assert_eq!(regs.get(SDA), 0);
    }
}
