//! Busy-wait delays.

use embedded_hal::delay::DelayNs;

use crate::platform::REFCLK_HZ;

/// Clocks per iteration of the spin loop: three instructions (nop, counter
/// update, branch) on a core that takes five clocks per instruction.
const CYCLES_PER_SPIN: u32 = 15;

/// Converts a duration in nanoseconds to clock cycles at `hz`, rounding up.
pub fn ns_to_cycles(ns: u32, hz: u32) -> u32 {
    let cycles = (u64::from(ns) * u64::from(hz)).div_ceil(1_000_000_000);
    u32::try_from(cycles).unwrap_or(u32::MAX)
}

#[inline(always)]
fn nop() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "riscv32")] {
            // Safety: a nop does nothing, which is the point.
            unsafe { core::arch::asm!("nop") }
        } else {
            core::hint::spin_loop()
        }
    }
}

/// Approximate delay by counting loop iterations. No hardware needed, and no
/// accuracy promised beyond "at least about this long".
#[derive(Copy, Clone, Debug)]
pub struct SpinDelay {
    hz: u32,
}

impl SpinDelay {
    pub const fn new(hz: u32) -> Self {
        Self { hz }
    }

    /// Number of spin iterations for `ns`.
    pub fn spins(&self, ns: u32) -> u32 {
        ns_to_cycles(ns, self.hz).div_ceil(CYCLES_PER_SPIN)
    }
}

impl Default for SpinDelay {
    fn default() -> Self {
        Self::new(REFCLK_HZ)
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        for _ in 0..self.spins(ns) {
            nop();
        }
    }
}
