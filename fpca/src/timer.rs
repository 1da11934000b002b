//! Hardware timer.
//!
//! Register map, one word each:
//!
//! - `0x0`: current count
//! - `0x4`: control and status
//!     - `[0]` run
//!     - `[1]` overflow interrupt enable
//!     - `[2]` PWM mode
//!     - `[8]` clear overflow
//!     - `[16]` overflow (read only)
//! - `0x8`: threshold; the count wraps to zero on reaching it
//! - `0xC`: PWM threshold

use embedded_hal::delay::DelayNs;

use crate::delay::ns_to_cycles;
use crate::platform::REFCLK_HZ;
use crate::reg::Reg;

const COUNT: usize = 0;
const CTRL: usize = 1;
const TOP: usize = 2;
const PWM: usize = 3;

const CTRL_RUN: u32 = 1 << 0;
const CTRL_IRQ_EN: u32 = 1 << 1;
const CTRL_PWM_EN: u32 = 1 << 2;
const CTRL_CLEAR_OFLOW: u32 = 1 << 8;
const CTRL_OFLOW: u32 = 1 << 16;

pub struct Timer {
    base: Reg,
}

impl Timer {
    /// # Safety
    ///
    /// `base` must be the address of a timer register block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base: Reg::at(base) }
    }

    fn reg(&self, index: usize) -> Reg {
        unsafe { self.base.offset(index) }
    }

    pub fn time(&self) -> u32 {
        self.reg(COUNT).read()
    }

    pub fn start(&mut self) {
        self.reg(CTRL).set_bits(CTRL_RUN);
    }

    pub fn stop(&mut self) {
        self.reg(CTRL).clear_bits(CTRL_RUN);
    }

    pub fn is_running(&self) -> bool {
        self.reg(CTRL).read() & CTRL_RUN != 0
    }

    pub fn enable_interrupt(&mut self) {
        self.reg(CTRL).set_bits(CTRL_IRQ_EN);
    }

    pub fn disable_interrupt(&mut self) {
        self.reg(CTRL).clear_bits(CTRL_IRQ_EN);
    }

    pub fn enable_pwm(&mut self) {
        self.reg(CTRL).set_bits(CTRL_PWM_EN);
    }

    pub fn disable_pwm(&mut self) {
        self.reg(CTRL).clear_bits(CTRL_PWM_EN);
    }

    pub fn clear_overflow(&mut self) {
        self.reg(CTRL).clear_bits(CTRL_CLEAR_OFLOW);
    }

    pub fn overflowed(&self) -> bool {
        self.reg(CTRL).read() & CTRL_OFLOW != 0
    }

    pub fn set_threshold(&mut self, value: u32) {
        self.reg(TOP).write(value);
    }

    pub fn threshold(&self) -> u32 {
        self.reg(TOP).read()
    }

    pub fn set_pwm_threshold(&mut self, value: u32) {
        self.reg(PWM).write(value);
    }

    pub fn pwm_threshold(&self) -> u32 {
        self.reg(PWM).read()
    }
}

/// Delays by watching the count. Assumes the timer free-runs, i.e. the
/// threshold is zero or far beyond any delay we're asked for.
impl DelayNs for Timer {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = ns_to_cycles(ns, REFCLK_HZ);
        if !self.is_running() {
            self.start();
        }
        let begin = self.time();
        while self.time().wrapping_sub(begin) < ticks {
            // spin
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::testing::FakeRegs;

    #[test]
    fn control_bits() {
        let mut regs = FakeRegs::new(4);
        let mut t = unsafe { Timer::new(regs.base()) };

        t.start();
        t.enable_pwm();
        assert_eq!(regs.get(CTRL), CTRL_RUN | CTRL_PWM_EN);
        assert!(t.is_running());

        t.enable_interrupt();
        t.disable_pwm();
        t.stop();
        assert_eq!(regs.get(CTRL), CTRL_IRQ_EN);
        t.disable_interrupt();
        assert_eq!(regs.get(CTRL), 0);
    }

    #[test]
    fn overflow_flag() {
        let mut regs = FakeRegs::new(4);
        let mut t = unsafe { Timer::new(regs.base()) };
        assert!(!t.overflowed());
        regs.set(CTRL, CTRL_OFLOW | CTRL_CLEAR_OFLOW | CTRL_RUN);
        assert!(t.overflowed());
        t.clear_overflow();
        assert_eq!(regs.get(CTRL), CTRL_OFLOW | CTRL_RUN);
    }

    #[test]
    fn thresholds() {
        let mut regs = FakeRegs::new(4);
        let mut t = unsafe { Timer::new(regs.base()) };
        t.set_threshold(50_000);
        t.set_pwm_threshold(25_000);
        assert_eq!(t.threshold(), 50_000);
        assert_eq!(t.pwm_threshold(), 25_000);
        assert_eq!(regs.get(TOP), 50_000);
        assert_eq!(regs.get(PWM), 25_000);
    }

    #[test]
    fn zero_delay_returns() {
        let mut regs = FakeRegs::new(4);
        let mut t = unsafe { Timer::new(regs.base()) };
        t.delay_ns(0);
        assert!(t.is_running());
    }
}
