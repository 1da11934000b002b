//! Memory tests over the memory-mapped PSRAM window, timed.

#![no_std]
#![no_main]

use fpca::memtest::{self, MemTestError, VolatileRegion};
use fpca::platform::{PSRAM_BASE, REFCLK_HZ, TIMER1_BASE};
use fpca::timer::Timer;
use fpca::uart::Uart;
use riscv_rt::entry;
use ufmt::uwriteln;

const TEST_BYTES: usize = 1024;

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("memtest");
    // Safety: nothing else uses the timer.
    let mut timer = unsafe { Timer::new(TIMER1_BASE) };
    // Safety: this bitstream maps the PSRAM here, and the demo owns it.
    let mut mem = unsafe { VolatileRegion::new(PSRAM_BASE, TEST_BYTES) };

    uwriteln!(uart, "testing {} bytes at {:#x}", TEST_BYTES, PSRAM_BASE).unwrap();

    timer.stop();
    timer.set_threshold(0);
    timer.start();
    let begin = timer.time();

    report(&mut uart, "data bus", memtest::data_bus(&mut mem, 0));
    report(&mut uart, "address bus", memtest::address_bus(&mut mem));
    report(&mut uart, "device", memtest::device(&mut mem));

    let ticks = timer.time().wrapping_sub(begin);
    uwriteln!(uart, "took {} us", ticks / (REFCLK_HZ / 1_000_000)).unwrap();

    loop {
        continue;
    }
}

fn report(uart: &mut Uart, name: &str, result: Result<(), MemTestError>) {
    match result {
        Ok(()) => uwriteln!(uart, "{}: passed", name).unwrap(),
        Err(e) => uwriteln!(uart, "{}: failed, {:?}", name, e).unwrap(),
    }
}
