//! Memory tests after Michael Barr, "Software-Based Memory Testing",
//! Embedded Systems Programming, July 2000.
//!
//! Run them in order: `data_bus` proves the data lines, which `address_bus`
//! relies on, which `device` relies on. `run` does exactly that.

use ufmt::derive::uDebug;

use crate::reg::Reg;

/// Something we can test: an array of 32-bit words.
pub trait WordMemory {
    fn words(&self) -> usize;
    fn read_word(&mut self, index: usize) -> u32;
    fn write_word(&mut self, index: usize, value: u32);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum MemTestError {
    /// Walking-ones `pattern` didn't read back.
    DataBus { pattern: u32 },
    /// Writing word 0 disturbed the word at `offset`.
    AddressStuckHigh { offset: usize },
    /// Writing the word at `offset` disturbed word 0.
    AddressStuckLow { offset: usize },
    /// Writing the word at `offset` disturbed another power-of-two offset.
    AddressShorted { offset: usize },
    /// The word at `offset` held `actual` rather than `expected`.
    Device { offset: usize, expected: u32, actual: u32 },
    /// Nothing to test: the memory has no words.
    Empty,
    /// Asked to test word `index`, which isn't there.
    OutOfRange { index: usize },
}

const PATTERN: u32 = 0xAAAA_AAAA;
const ANTIPATTERN: u32 = 0x5555_5555;

/// Walking-ones test of the data lines at a single word.
pub fn data_bus<M: WordMemory + ?Sized>(mem: &mut M, index: usize) -> Result<(), MemTestError> {
    if mem.words() == 0 {
        return Err(MemTestError::Empty);
    }
    if index >= mem.words() {
        return Err(MemTestError::OutOfRange { index });
    }
    for bit in 0..32 {
        let pattern = 1u32 << bit;
        mem.write_word(index, pattern);
        if mem.read_word(index) != pattern {
            return Err(MemTestError::DataBus { pattern });
        }
    }
    Ok(())
}

/// Power-of-two word offsets below the memory's size: 1, 2, 4, ...
fn power_offsets(words: usize) -> impl Iterator<Item = usize> {
    let mask = words.saturating_sub(1);
    (0..usize::BITS)
        .map(|bit| 1usize << bit)
        .take_while(move |&offset| offset & mask != 0)
}

/// Checks each address line for stuck-high, stuck-low and shorts, by writing
/// at power-of-two offsets and looking for aliasing.
///
/// Works best when the memory's size is a power of two and its base is
/// aligned to its size.
pub fn address_bus<M: WordMemory + ?Sized>(mem: &mut M) -> Result<(), MemTestError> {
    let words = mem.words();
    if words == 0 {
        return Err(MemTestError::Empty);
    }

    for offset in power_offsets(words) {
        mem.write_word(offset, PATTERN);
    }

    mem.write_word(0, ANTIPATTERN);
    for offset in power_offsets(words) {
        if mem.read_word(offset) != PATTERN {
            return Err(MemTestError::AddressStuckHigh { offset });
        }
    }
    mem.write_word(0, PATTERN);

    for test_offset in power_offsets(words) {
        mem.write_word(test_offset, ANTIPATTERN);

        if mem.read_word(0) != PATTERN {
            return Err(MemTestError::AddressStuckLow { offset: test_offset });
        }
        for offset in power_offsets(words) {
            if offset != test_offset && mem.read_word(offset) != PATTERN {
                return Err(MemTestError::AddressShorted { offset: test_offset });
            }
        }

        mem.write_word(test_offset, PATTERN);
    }
    Ok(())
}

/// Increment/decrement test of every bit of every word.
pub fn device<M: WordMemory + ?Sized>(mem: &mut M) -> Result<(), MemTestError> {
    let words = mem.words();
    let pattern = |offset: usize| (offset as u32).wrapping_add(1);

    for offset in 0..words {
        mem.write_word(offset, pattern(offset));
    }

    for offset in 0..words {
        let (expected, actual) = (pattern(offset), mem.read_word(offset));
        if actual != expected {
            return Err(MemTestError::Device { offset, expected, actual });
        }
        mem.write_word(offset, !expected);
    }

    for offset in 0..words {
        let (expected, actual) = (!pattern(offset), mem.read_word(offset));
        if actual != expected {
            return Err(MemTestError::Device { offset, expected, actual });
        }
    }
    Ok(())
}

/// All three tests, data bus at word 0.
pub fn run<M: WordMemory + ?Sized>(mem: &mut M) -> Result<(), MemTestError> {
    data_bus(mem, 0)?;
    address_bus(mem)?;
    device(mem)
}

impl WordMemory for [u32] {
    fn words(&self) -> usize {
        self.len()
    }

    fn read_word(&mut self, index: usize) -> u32 {
        self[index]
    }

    fn write_word(&mut self, index: usize, value: u32) {
        self[index] = value;
    }
}

/// A range of memory accessed with volatile loads and stores.
pub struct VolatileRegion {
    base: Reg,
    words: usize,
}

impl VolatileRegion {
    /// # Safety
    ///
    /// `base` must be word aligned and the `bytes` bytes from it must be
    /// memory that nothing else is using (its contents are destroyed).
    pub const unsafe fn new(base: usize, bytes: usize) -> Self {
        Self { base: Reg::at(base), words: bytes / 4 }
    }
}

impl WordMemory for VolatileRegion {
    fn words(&self) -> usize {
        self.words
    }

    fn read_word(&mut self, index: usize) -> u32 {
        assert!(index < self.words);
        unsafe { self.base.offset(index) }.read()
    }

    fn write_word(&mut self, index: usize, value: u32) {
        assert!(index < self.words);
        unsafe { self.base.offset(index) }.write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psram::testing::SimPsram;
    use crate::psram::Psram;

    /// Memory with configurable faults.
    struct Faulty {
        cells: Vec<u32>,
        /// Data bits that always read as zero.
        stuck_low_bits: u32,
        /// Address bits that the decoder ignores.
        ignored_addr_bits: usize,
        /// One word that reads as zero whatever is written.
        dead_word: Option<usize>,
        /// Writes to the first word also land in the second.
        write_alias: Option<(usize, usize)>,
    }

    impl Faulty {
        fn new(words: usize) -> Self {
            Self { cells: vec![0; words], stuck_low_bits: 0, ignored_addr_bits: 0, dead_word: None, write_alias: None }
        }
    }

    impl WordMemory for Faulty {
        fn words(&self) -> usize {
            self.cells.len()
        }

        fn read_word(&mut self, index: usize) -> u32 {
            if self.dead_word == Some(index) {
                return 0;
            }
            self.cells[index & !self.ignored_addr_bits] & !self.stuck_low_bits
        }

        fn write_word(&mut self, index: usize, value: u32) {
            self.cells[index & !self.ignored_addr_bits] = value;
            if let Some((from, to)) = self.write_alias {
                if index == from {
                    self.cells[to] = value;
                }
            }
        }
    }

    #[test]
    fn good_memory_passes() {
        let mut mem = vec![0u32; 256];
        assert_eq!(run(&mut mem[..]), Ok(()));
        let mut f = Faulty::new(256);
        assert_eq!(run(&mut f), Ok(()));
    }

    #[test]
    fn stuck_data_line() {
        let mut f = Faulty::new(64);
        f.stuck_low_bits = 1 << 5;
        assert_eq!(run(&mut f), Err(MemTestError::DataBus { pattern: 1 << 5 }));
    }

    #[test]
    fn aliased_address_line() {
        let mut f = Faulty::new(64);
        f.ignored_addr_bits = 1 << 3;
        assert_eq!(data_bus(&mut f, 0), Ok(()));
        assert_eq!(address_bus(&mut f), Err(MemTestError::AddressStuckHigh { offset: 8 }));
    }

    #[test]
    fn address_line_stuck_low() {
        let mut f = Faulty::new(64);
        f.write_alias = Some((16, 0));
        assert_eq!(data_bus(&mut f, 0), Ok(()));
        assert_eq!(address_bus(&mut f), Err(MemTestError::AddressStuckLow { offset: 16 }));
    }

    #[test]
    fn shorted_address_lines() {
        let mut f = Faulty::new(64);
        f.write_alias = Some((2, 8));
        assert_eq!(data_bus(&mut f, 0), Ok(()));
        assert_eq!(address_bus(&mut f), Err(MemTestError::AddressShorted { offset: 2 }));
    }

    #[test]
    fn empty_memory() {
        let mut none: [u32; 0] = [];
        assert_eq!(run(&mut none[..]), Err(MemTestError::Empty));
        assert_eq!(address_bus(&mut none[..]), Err(MemTestError::Empty));
        assert_eq!(device(&mut none[..]), Ok(()));

        // Too small to hold a single word.
        let mut backing = [0u32; 1];
        let mut r = unsafe { VolatileRegion::new(backing.as_mut_ptr() as usize, 3) };
        assert_eq!(run(&mut r), Err(MemTestError::Empty));
    }

    #[test]
    fn data_bus_index_checked() {
        let mut mem = [0u32; 4];
        assert_eq!(data_bus(&mut mem[..], 3), Ok(()));
        assert_eq!(data_bus(&mut mem[..], 4), Err(MemTestError::OutOfRange { index: 4 }));
    }

    #[test]
    fn dead_cell() {
        let mut f = Faulty::new(64);
        f.dead_word = Some(10);
        assert_eq!(data_bus(&mut f, 0), Ok(()));
        assert_eq!(address_bus(&mut f), Ok(()));
        assert_eq!(
            device(&mut f),
            Err(MemTestError::Device { offset: 10, expected: 11, actual: 0 })
        );
    }

    #[test]
    fn offsets() {
        assert_eq!(power_offsets(16).collect::<Vec<_>>(), vec![1, 2, 4, 8]);
        assert_eq!(power_offsets(1).count(), 0);
        assert_eq!(power_offsets(0).count(), 0);
    }

    #[test]
    fn volatile_region() {
        let mut backing = vec![0u32; 64];
        let mut r = unsafe { VolatileRegion::new(backing.as_mut_ptr() as usize, 256) };
        assert_eq!(r.words(), 64);
        assert_eq!(run(&mut r), Ok(()));
    }

    #[test]
    fn psram_over_spi() {
        let mut p = Psram::new(SimPsram::default());
        assert_eq!(data_bus(&mut p, 0), Ok(()));
        // Device test over all 8 MiB would take a while on the simulator;
        // the address lines are what matter here.
        assert_eq!(address_bus(&mut p), Ok(()));
    }
}
