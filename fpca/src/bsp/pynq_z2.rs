//! BSP for the TUL Pynq-Z2.
//!
//! The board has four buttons in a row (BTN0..BTN3), which stand in for the
//! Basys3 cross. The Zynq PS UART is brought up as a second console.

use super::Bsp;
use crate::gpio::Button;
use crate::platform::ZYNQ_PS_UART_BASE;
use crate::uart::ByteIo;
use crate::zynq_uart::ZynqUart;

pub enum Board {}

fn ps_uart() -> ZynqUart {
    // Safety: the PS UART is at a fixed address in the Zynq's memory map and
    // we only ever poke its FIFO and control registers.
    unsafe { ZynqUart::new(ZYNQ_PS_UART_BASE) }
}

impl Bsp for Board {
    const NAME: &'static str = "Pynq-Z2";

    fn button_bit(button: Button) -> u32 {
        match button {
            Button::Down => 0,
            Button::Right => 1,
            Button::Left => 2,
            Button::Up => 3,
        }
    }

    fn configure() {
        ps_uart().setup();
    }

    fn debug_puts(s: &str) {
        ps_uart().puts(s);
    }
}
