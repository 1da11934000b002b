//! APS6404-style serial PSRAM (8 MiB, 23-bit addresses) over plain SPI.
//!
//! Only the single-bit SPI commands are used; every access is its own
//! chip-select frame.

use crate::memtest::WordMemory;
use crate::spi::SpiMaster;

const CMD_WRITE: u8 = 0x02;
const CMD_READ: u8 = 0x03;
const CMD_RESET_ENABLE: u8 = 0x66;
const CMD_RESET: u8 = 0x99;
const CMD_READ_ID: u8 = 0x9F;

/// Highest address bit is 22.
pub const ADDR_MASK: u32 = 0x007F_FFFF;
pub const SIZE_BYTES: usize = ADDR_MASK as usize + 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PsramId {
    pub manufacturer: u8,
    /// Known-good-die flag.
    pub kgd: u8,
    /// Extended ID, most significant byte first.
    pub eid: [u8; 6],
}

impl PsramId {
    /// Density code from the top three bits of the EID.
    pub fn density(&self) -> u8 {
        self.eid[0] >> 5
    }

    pub fn capacity_mbit(&self) -> u32 {
        2 << (u32::from(self.density()) + 3)
    }
}

pub struct Psram<S> {
    spi: S,
}

impl<S: SpiMaster> Psram<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    pub fn release(self) -> S {
        self.spi
    }

    fn begin(&mut self, cmd: u8, addr: u32) {
        let addr = addr & ADDR_MASK;
        self.spi.deselect();
        self.spi.select();
        self.spi.write_byte(cmd);
        self.spi.write_byte((addr >> 16) as u8);
        self.spi.write_byte((addr >> 8) as u8);
        self.spi.write_byte(addr as u8);
    }

    pub fn write_byte(&mut self, addr: u32, data: u8) {
        self.write(addr, &[data]);
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let mut b = [0];
        self.read(addr, &mut b);
        b[0]
    }

    /// Burst write starting at `addr`. The device wraps within its page on
    /// long bursts, so callers should keep bursts within 1 KiB pages.
    pub fn write(&mut self, addr: u32, data: &[u8]) {
        self.begin(CMD_WRITE, addr);
        self.spi.write_bytes(data);
        self.spi.deselect();
    }

    /// Burst read starting at `addr`, with no wait states (max 33 MHz).
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) {
        self.begin(CMD_READ, addr);
        self.spi.read_bytes(buf);
        self.spi.deselect();
    }

    pub fn reset(&mut self) {
        for cmd in [CMD_RESET_ENABLE, CMD_RESET] {
            self.spi.deselect();
            self.spi.select();
            self.spi.write_byte(cmd);
            self.spi.deselect();
        }
    }

    pub fn read_id(&mut self) -> PsramId {
        // The address is don't-care for this command.
        self.begin(CMD_READ_ID, ADDR_MASK);
        let manufacturer = self.spi.read_byte();
        let kgd = self.spi.read_byte();
        let mut eid = [0; 6];
        self.spi.read_bytes(&mut eid);
        self.spi.deselect();
        PsramId { manufacturer, kgd, eid }
    }
}

/// Words are stored little-endian, four bytes each from address 0.
impl<S: SpiMaster> WordMemory for Psram<S> {
    fn words(&self) -> usize {
        SIZE_BYTES / 4
    }

    fn read_word(&mut self, index: usize) -> u32 {
        let mut b = [0; 4];
        self.read((index * 4) as u32, &mut b);
        u32::from_le_bytes(b)
    }

    fn write_word(&mut self, index: usize, value: u32) {
        self.write((index * 4) as u32, &value.to_le_bytes());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use crate::spi::SpiMaster;

    /// Enough of an APS6404 to answer reads, writes and READ ID.
    #[derive(Default)]
    pub struct SimPsram {
        pub mem: HashMap<u32, u8>,
        pub frames: usize,
        selected: bool,
        header: Vec<u8>,
        cursor: u32,
        id_out: Vec<u8>,
    }

    impl SimPsram {
        fn address(&self) -> u32 {
            u32::from(self.header[1]) << 16 | u32::from(self.header[2]) << 8 | u32::from(self.header[3])
        }
    }

    impl SpiMaster for SimPsram {
        fn select(&mut self) {
            assert!(!self.selected, "select while already selected");
            self.selected = true;
            self.header.clear();
            self.id_out.clear();
            self.frames += 1;
        }

        fn deselect(&mut self) {
            self.selected = false;
        }

        fn write_byte(&mut self, byte: u8) {
            assert!(self.selected);
            if self.header.len() < 4 {
                self.header.push(byte);
                if self.header.len() == 4 {
                    self.cursor = self.address();
                    if self.header[0] == 0x9F {
                        // MF, KGD, EID (64 Mbit part)
                        self.id_out = vec![0x0D, 0x5D, 0x52, 0x00, 0x11, 0x22, 0x33, 0x44];
                        self.id_out.reverse();
                    }
                }
                return;
            }
            assert_eq!(self.header[0], 0x02, "data written outside a WRITE");
            self.mem.insert(self.cursor, byte);
            self.cursor = (self.cursor + 1) & super::ADDR_MASK;
        }

        fn read_byte(&mut self) -> u8 {
            assert!(self.selected);
            assert_eq!(self.header.len(), 4, "read before command complete");
            match self.header[0] {
                0x03 => {
                    let b = self.mem.get(&self.cursor).copied().unwrap_or(0);
                    self.cursor = (self.cursor + 1) & super::ADDR_MASK;
                    b
                }
                0x9F => self.id_out.pop().unwrap_or(0xFF),
                cmd => panic!("read during command {cmd:#x}"),
            }
        }

        fn set_throttle(&mut self, _throttle: u8) {}
    }
}
