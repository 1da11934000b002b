//! SD card bring-up: initialise the card, then read block 0 and list its
//! partitions.

#![no_std]
#![no_main]

use fpca::delay::SpinDelay;
use fpca::mbr::{Mbr, SECTOR_SIZE};
use fpca::platform::SDCARD_SPI_BASE;
use fpca::sdcard::{SdCard, SdError};
use fpca::spi::Spi;
use fpca::uart::Uart;
use riscv_rt::entry;
use ufmt::{uwrite, uwriteln};

#[entry]
fn main() -> ! {
    let mut uart = fpca_demos::startup("sdcard");
    // Safety: nothing else uses the SD card's SPI master.
    let spi = unsafe { Spi::new(SDCARD_SPI_BASE) };
    let mut card = SdCard::new(spi, SpinDelay::default());

    uwriteln!(uart, "Starting Disk Initialisation!").unwrap();
    match card.init() {
        Ok(kind) => uwriteln!(uart, "Card ready: {:?}", kind).unwrap(),
        Err(e) => {
            report(&mut uart, e);
            halt();
        }
    }

    match card.read_ocr() {
        Ok((r1, ocr)) => uwriteln!(uart, "R1 {:#x}, OCR {:#x}", r1.0, ocr.0).unwrap(),
        Err(e) => report(&mut uart, e),
    }

    let mut block = [0u8; SECTOR_SIZE];
    if let Err(e) = card.read_block(0, &mut block) {
        report(&mut uart, e);
        halt();
    }
    dump(&mut uart, &block[..64]);

    match Mbr::parse(&block) {
        Ok(mbr) => {
            for (i, p) in mbr.partitions.iter().enumerate() {
                if !p.is_used() {
                    continue;
                }
                uwriteln!(
                    uart,
                    "partition {}: type {:#x}{}{}, {} sectors from {}",
                    i,
                    p.kind,
                    if p.is_fat() { " (FAT)" } else { "" },
                    if p.is_bootable() { " bootable" } else { "" },
                    p.sectors,
                    p.first_lba
                )
                .unwrap();
            }
        }
        Err(e) => uwriteln!(uart, "no partition table: {:?}", e).unwrap(),
    }
    halt();
}

fn report(uart: &mut Uart, e: SdError) {
    uwriteln!(uart, "SD card error: {:?}", e).unwrap();
    if let SdError::Command { r1, .. } = e {
        for name in r1.flag_names() {
            uwriteln!(uart, "  {}", name).unwrap();
        }
    }
}

fn dump(uart: &mut Uart, bytes: &[u8]) {
    for line in bytes.chunks(16) {
        for b in line {
            uwrite!(uart, "{:02x} ", *b).unwrap();
        }
        uwriteln!(uart, "").unwrap();
    }
}

fn halt() -> ! {
    loop {
        continue;
    }
}
