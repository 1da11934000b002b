//! Board bring-up: LEDs follow the buttons, the seven-segment display counts,
//! the UART echoes, and buttons change the baud rate.

#![no_std]
#![no_main]

use embedded_hal::delay::DelayNs;
use fpca::bsp::Bsp;
use fpca::gpio::Button;
use fpca::platform::TIMER1_BASE;
use fpca::timer::Timer;
use fpca::uart::ByteIo;
use fpca_demos::Board;
use riscv_rt::entry;
use ufmt::uwriteln;

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("blinky");
    let mut gpio = fpca_demos::gpio();
    // Safety: nothing else uses the timer.
    let mut timer = unsafe { Timer::new(TIMER1_BASE) };
    timer.start();

    let mut count = 0u32;
    let mut held = 0u32;
    loop {
        let buttons = gpio.buttons();
        gpio.set_leds(buttons);
        // Act once per press rather than for as long as it's held.
        let pressed = buttons & !held;
        held = buttons;

        // Simple UART echo server.
        if let Some(c) = uart.try_read_byte() {
            uart.write_byte(c);
        }

        let is = |b: Button| fpca::get_bit(pressed, Board::button_bit(b)) != 0;
        let rate = if is(Button::Left) {
            Some(("Left", 9600))
        } else if is(Button::Right) {
            Some(("Right", 19200))
        } else if is(Button::Up) {
            Some(("Up", 115_200))
        } else {
            if is(Button::Down) {
                uwriteln!(uart, "Down Button Pressed").unwrap();
            }
            None
        };
        if let Some((name, rate)) = rate {
            uwriteln!(uart, "{} Button Pressed", name).unwrap();
            uwriteln!(uart, "Setting Baud Rate to {}", rate).unwrap();
            uart.flush();
            if let Err(e) = uart.set_baud(rate) {
                uwriteln!(uart, "can't: {:?}", e).unwrap();
            }
        }

        count = count.wrapping_add(1);
        gpio.set_sseg(count);
        timer.delay_ms(10);
    }
}
