//! Volatile access to 32-bit memory-mapped registers.

/// A single 32-bit register at a fixed address.
///
/// Creating one is `unsafe`; once created, reads and writes are safe, because
/// the creator has promised the address is a register we're allowed to poke.
#[derive(Copy, Clone, Debug)]
pub struct Reg(*mut u32);

impl Reg {
    /// # Safety
    ///
    /// `addr` must be the address of a readable and writable 32-bit register
    /// (or word of memory) that stays valid for as long as this `Reg` and any
    /// copies of it are used.
    pub const unsafe fn at(addr: usize) -> Self {
        Self(addr as *mut u32)
    }

    /// Returns the register `index` words past this one.
    ///
    /// # Safety
    ///
    /// Same contract as [`Reg::at`] for the resulting address.
    pub const unsafe fn offset(self, index: usize) -> Self {
        Self(self.0.wrapping_add(index))
    }

    pub fn addr(self) -> usize {
        self.0 as usize
    }

    pub fn read(self) -> u32 {
        unsafe { self.0.read_volatile() }
    }

    pub fn write(self, value: u32) {
        unsafe { self.0.write_volatile(value) }
    }

    /// Read-modify-write.
    pub fn modify(self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }

    pub fn set_bits(self, mask: u32) {
        self.modify(|v| v | mask);
    }

    pub fn clear_bits(self, mask: u32) {
        self.modify(|v| v & !mask);
    }
}
