//! VGA text console: colour banners drawn straight to the display, then a
//! stream of numbered lines to show the terminal scrolling.

#![no_std]
#![no_main]

use embedded_hal::delay::DelayNs;
use fpca::console::Console;
use fpca::delay::SpinDelay;
use fpca::platform::TEXT_BASE;
use fpca::text::{Colour, TextDisplay, TEXT_H, TEXT_W};
use riscv_rt::entry;
use ufmt::uwriteln;

const BANNER: &[u8] = b"FPCA text console";

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("console");
    let mut delay = SpinDelay::default();
    // Safety: nothing else draws on the text display.
    let mut con = Console::new(unsafe { TextDisplay::new(TEXT_BASE) });

    con.cls();
    banners(con.display());
    uwriteln!(uart, "banners drawn").unwrap();
    pixels();
    delay.delay_ms(2000);

    con.cls();
    uwriteln!(con, "Hello from the console!").unwrap();
    uwriteln!(con, "{} columns by {} rows", TEXT_W, TEXT_H).unwrap();
    uwriteln!(con, "tabs:\t1\t2\t3").unwrap();
    let mut n = 0u32;
    loop {
        uwriteln!(con, "line {}", n).unwrap();
        n = n.wrapping_add(1);
        delay.delay_ms(250);
    }
}

fn banners(display: &mut TextDisplay) {
    const COLOURS: [Colour; 8] = [
        Colour::Red,
        Colour::Green,
        Colour::Blue,
        Colour::Yellow,
        Colour::Magenta,
        Colour::Cyan,
        Colour::White,
        Colour::Grey,
    ];

    // A stripe of each background colour across the top of the screen.
    for (i, &c) in COLOURS.iter().enumerate() {
        let x = i * TEXT_W / COLOURS.len();
        display.fill(x, 0, x + TEXT_W / COLOURS.len() - 1, 2, c);
    }
    // Title centred, then every foreground on black below it.
    display.string((TEXT_W - BANNER.len()) / 2, 4, BANNER, Colour::White, Colour::Blue);
    for (i, &c) in COLOURS.iter().enumerate() {
        display.string(2, 6 + i, b"The quick brown fox", c, Colour::Black);
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "target-board-pynq-z2")] {
        use fpca::pixel::{self, PixelDisplay, PIXELS_X, PIXELS_Y};
        use fpca::platform::FRAMEBUF_BASE;

        /// Colour bars on the DDR framebuffer.
        fn pixels() {
            const BARS: [u32; 8] = [
                pixel::WHITE,
                pixel::YELLOW,
                pixel::CYAN,
                pixel::GREEN,
                pixel::MAGENTA,
                pixel::RED,
                pixel::BLUE,
                pixel::GREY,
            ];
            // Safety: the framebuffer region of DDR is ours.
            let mut fb = unsafe { PixelDisplay::new(FRAMEBUF_BASE) };
            fb.clear(pixel::BLACK);
            for y in 0..PIXELS_Y {
                for x in 0..PIXELS_X {
                    fb.set(x, y, BARS[x * BARS.len() / PIXELS_X]);
                }
            }
        }
    } else {
        /// No pixel framebuffer on this board.
        fn pixels() {}
    }
}
