//! PSRAM over plain SPI: identify the part, check a byte round trip, then
//! run the memory tests over the whole device.

#![no_std]
#![no_main]

use fpca::memtest;
use fpca::platform::PSRAM_BASE;
use fpca::psram::Psram;
use fpca::spi::Spi;
use riscv_rt::entry;
use ufmt::uwriteln;

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("psram");
    // Safety: this bitstream puts an SPI master at the PSRAM address, and
    // nothing else uses it.
    let mut psram = Psram::new(unsafe { Spi::new(PSRAM_BASE) });

    psram.reset();
    let id = psram.read_id();
    uwriteln!(uart, "MF ID: {:#x}, KGD: {:#x}", id.manufacturer, id.kgd).unwrap();
    uwriteln!(uart, "density: {}, {} Mbit", id.density(), id.capacity_mbit()).unwrap();

    for (addr, value) in [(0x00_0000, 0xA5), (0x12_3456, 0x5A), (0x7F_FFFF, 0x42)] {
        psram.write_byte(addr, value);
        let back = psram.read_byte(addr);
        if back == value {
            uwriteln!(uart, "{:#x}: ok", addr).unwrap();
        } else {
            uwriteln!(uart, "{:#x}: wrote {:#x}, read {:#x}", addr, value, back).unwrap();
        }
    }

    uwriteln!(uart, "testing...").unwrap();
    match memtest::run(&mut psram) {
        Ok(()) => uwriteln!(uart, "PSRAM passed").unwrap(),
        Err(e) => uwriteln!(uart, "PSRAM failed: {:?}", e).unwrap(),
    }

    loop {
        continue;
    }
}
