//! BSP for the Digilent Basys3.
//!
//! The five-button cross is wired to the button register with the centre
//! button left out.

use super::Bsp;
use crate::gpio::Button;

pub enum Board {}

impl Bsp for Board {
    const NAME: &'static str = "Basys3";

    fn button_bit(button: Button) -> u32 {
        match button {
            Button::Down => 0,
            Button::Right => 1,
            Button::Left => 2,
            Button::Up => 3,
        }
    }
}
