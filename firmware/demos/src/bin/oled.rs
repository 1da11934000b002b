//! SSD1306 bring-up: flash the panel, write some text directly, then drive
//! it from a terminal buffer.

#![no_std]
#![no_main]

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use fpca::delay::SpinDelay;
use fpca::i2c::{BitBangI2c, I2cError};
use fpca::ssd1306::{OledText, Ssd1306, DEFAULT_PAGES, TEXT_COLUMNS};
use fpca::terminal::Terminal;
use fpca::uart::Uart;
use riscv_rt::entry;
use ufmt::{uwrite, uwriteln};

/// One terminal cell per character cell of a 128x64 panel.
type OledTerminal = Terminal<{ TEXT_COLUMNS as usize }, { DEFAULT_PAGES as usize }>;

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("oled");
    let mut delay = SpinDelay::default();

    let (scl, sda) = fpca_demos::gpio().i2c_pins();
    let bus = BitBangI2c::new(scl, sda, SpinDelay::default());
    let mut oled = Ssd1306::new(bus);

    if let Err(e) = bring_up(&mut oled, &mut delay) {
        report(&mut uart, e);
    }
    uwriteln!(uart, "OLED initialised").unwrap();

    let mut text = OledText::new(oled);
    if let Err(e) = greet(&mut text) {
        report(&mut uart, e);
    }
    delay.delay_ms(2000);

    let mut oled = text.release();
    let mut term = OledTerminal::new();
    let mut n = 0u32;
    loop {
        uwriteln!(term, "tick {}", n).unwrap();
        if let Err(e) = oled.refresh(&term) {
            report(&mut uart, e);
        }
        n = n.wrapping_add(1);
        delay.delay_ms(500);
    }
}

fn bring_up<I: I2c>(oled: &mut Ssd1306<I>, delay: &mut SpinDelay) -> Result<(), I::Error> {
    oled.init()?;
    oled.whole_display_on()?;
    delay.delay_ms(500);
    oled.resume_ram_content()?;
    oled.clear()?;
    oled.set_cursor(0, 0)?;
    for _ in 0..TEXT_COLUMNS {
        oled.write_solid_char()?;
    }
    delay.delay_ms(500);
    oled.clear()
}

fn greet<I: I2c>(text: &mut OledText<I>) -> Result<(), I::Error> {
    let pages = text.display().pages();
    text.puts("Hello, FPCA!\n")?;
    uwrite!(*text, "{} pages", pages)?;
    text.newline()
}

fn report(uart: &mut Uart, e: I2cError) {
    uwriteln!(uart, "OLED error: {:?}", e).unwrap();
}
