//! Board support.
//!
//! The SoC is the same on every board, but the boards differ in what's
//! around it. To add a board:
//!
//! 1. Create a module here named after it, containing a `Board` type.
//! 2. Implement `Bsp` for `Board`.
//! 3. Add a `target-board-*` feature to the firmware crates and a branch to
//!    their `cfg_if` board selection.

// Every BSP is always compiled, whichever board is selected, so that they all
// stay building.
pub mod basys3;
pub mod pynq_z2;

use crate::gpio::Button;

pub trait Bsp {
    /// Human-readable board name, for banners.
    const NAME: &'static str;

    /// Bit in the button register that reports `button`.
    fn button_bit(button: Button) -> u32;

    /// Sets up any board-level I/O. Called once at startup.
    fn configure() {}

    /// Writes a line to a secondary debug console, if the board has one.
    fn debug_puts(_s: &str) {}
}
