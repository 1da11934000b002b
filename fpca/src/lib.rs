//! Drivers and support code for the FPCA, a small RV32I SoC that lives on
//! Basys3 and Pynq-Z2 FPGA boards.
//!
//! Everything here is single-threaded and polled. Drivers that touch hardware
//! are constructed from a base address (which is `unsafe`, since we can't
//! check it) and are safe to use after that.

#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod bsp;
pub mod console;
pub mod delay;
pub mod font;
pub mod gpio;
pub mod i2c;
pub mod mbr;
pub mod memtest;
pub mod pixel;
pub mod platform;
pub mod psram;
pub mod reg;
pub mod sdcard;
pub mod spi;
pub mod ssd1306;
pub mod terminal;
pub mod text;
pub mod timer;
pub mod uart;
pub mod zynq_uart;

/// Extracts bit `n` of `reg` as 0 or 1. Bits past the top are 0.
pub fn get_bit(reg: u32, n: u32) -> u32 {
    reg.checked_shr(n).unwrap_or(0) & 1
}
