//! Bits shared by the demo programs: board selection, startup, and a panic
//! handler that says where it happened.

#![no_std]

use core::panic::PanicInfo;

use fpca::bsp::Bsp;
use fpca::gpio::Gpio;
use fpca::platform::{BOOT_SWITCH, GPIO_BASE, TINYBOOT_BASE, UART_BASE};
use fpca::uart::Uart;
use ufmt::uwriteln;

cfg_if::cfg_if! {
    if #[cfg(feature = "target-board-pynq-z2")] {
        pub use fpca::bsp::pynq_z2::Board;
    } else if #[cfg(feature = "target-board-basys3")] {
        pub use fpca::bsp::basys3::Board;
    }
}

/// Rate the demos talk at, same as the bootloader.
pub const BAUD: u32 = 9600;

pub fn uart() -> Uart {
    // Safety: fixed address, and the demos are single threaded.
    unsafe { Uart::new(UART_BASE) }
}

pub fn gpio() -> Gpio {
    // Safety: as above.
    unsafe { Gpio::new(GPIO_BASE) }
}

/// Common startup: board setup, a detour into the bootloader if the boot
/// switch is up, then the UART at `BAUD` with a banner.
pub fn startup(name: &str) -> Uart {
    Board::configure();

    if gpio().switch(BOOT_SWITCH) {
        enter_bootloader();
    }

    let mut uart = uart();
    let baud = uart.set_baud(BAUD);
    uwriteln!(uart, "\r\nThe FPCA has booted! ({}, {})", name, Board::NAME).unwrap();
    if let Err(e) = baud {
        uwriteln!(uart, "can't set {} baud: {:?}", BAUD, e).unwrap();
    }
    Board::debug_puts(name);
    uart
}

/// Jumps to tinyboot, which never comes back.
pub fn enter_bootloader() -> ! {
    unsafe {
        core::arch::asm!(
            "jr {entry}",
            entry = in(reg) TINYBOOT_BASE,
            options(noreturn),
        );
    }
}

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    // Whoever had the UART is never getting it back.
    let mut uart = uart();
    match info.location() {
        Some(l) => uwriteln!(uart, "panic at {}:{}", l.file(), l.line()).unwrap(),
        None => uwriteln!(uart, "panic").unwrap(),
    }
    loop {
        continue;
    }
}
