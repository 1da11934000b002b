//! The FPCA address map.
//!
//! These are fixed by the SoC's bus interconnect and are the same on every
//! board; see `bsp` for the things that do vary.

/// System (and peripheral) clock.
pub const REFCLK_HZ: u32 = 50_000_000;

/// On-chip block RAM, where programs run from. The CPU resets to its start.
pub const BRAM_BASE: usize = 0x0000_0000;
pub const BRAM_SIZE: usize = 64 * 1024;
/// tinyboot lives in the top 4 KiB of block RAM, out of the way of the
/// programs it loads.
pub const TINYBOOT_BASE: usize = BRAM_BASE + BRAM_SIZE - 4 * 1024;
/// Switch that asks a program to hand over to the bootloader at startup.
pub const BOOT_SWITCH: u32 = 15;

/// LEDs, seven-segment display, I2C pins, buttons and switches.
pub const GPIO_BASE: usize = 0x1000_0000;

pub const UART_BASE: usize = 0x2000_0000;
pub const TIMER1_BASE: usize = 0x3000_0000;
pub const TEXT_BASE: usize = 0x4000_0000;
pub const SDCARD_SPI_BASE: usize = 0x5000_0000;
/// PSRAM. Depending on the bitstream this is either the register block of a
/// plain SPI master wired to the PSRAM, or the memory-mapped PSRAM window.
pub const PSRAM_BASE: usize = 0x6000_0000;

/// Upper 256 MiB of the Pynq-Z2's DDR, shared with the PS.
pub const DDR3_BASE: usize = 0xD000_0000;
pub const FRAMEBUF_BASE: usize = DDR3_BASE;
pub const ZYNQ_PS_UART_BASE: usize = 0xE000_0000;
