//! The serial boot protocol.
//!
//! The device announces itself with XON. The host answers with SOH, a 32-bit
//! load address (LSB first), STX, the image, and ETX:
//!
//! ```text
//! device: XON
//! host:   SOH a0 a1 a2 a3 STX d0 d1 ... dn ETX
//! ```
//!
//! Anything before SOH, and between the address and STX, is ignored. There's
//! no escaping, so an image can't contain an ETX byte.

use core::ops::RangeInclusive;

use ufmt::derive::uDebug;

use crate::uart::ByteIo;

pub const NUL: u8 = 0x00;
pub const SOH: u8 = 0x01;
pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const EOT: u8 = 0x04;
pub const XON: u8 = 0x11;
pub const XOFF: u8 = 0x13;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum BootError {
    /// The image would have written to `address`, outside the load window.
    OutOfBounds { address: u32 },
    /// The image ran off the top of the address space.
    AddressOverflow,
    /// Byte `offset` of an image is ETX, which would end it early.
    EtxInPayload { offset: usize },
}

/// Where a received image landed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub struct Image {
    pub start: u32,
    pub len: u32,
}

impl Image {
    pub fn end(&self) -> u32 {
        self.start.wrapping_add(self.len)
    }
}

fn skip_until<IO: ByteIo + ?Sized>(io: &mut IO, marker: u8) {
    while io.read_byte() != marker {}
}

/// Runs the device side of one transfer, handing each payload byte and its
/// address to `store`.
///
/// `window` is inclusive so that it can reach the top of memory. Nothing
/// outside it is passed to `store`; the first byte that would be ends the
/// transfer with an error, leaving the rest unread.
pub fn receive_image<IO: ByteIo + ?Sized>(
    io: &mut IO,
    window: RangeInclusive<u32>,
    mut store: impl FnMut(u32, u8),
) -> Result<Image, BootError> {
    io.write_byte(XON);
    io.flush();

    skip_until(io, SOH);
    let start = io.read_u32_le();
    skip_until(io, STX);

    let mut next = Some(start);
    let mut len = 0u32;
    loop {
        let byte = io.read_byte();
        if byte == ETX {
            return Ok(Image { start, len });
        }
        let address = next.ok_or(BootError::AddressOverflow)?;
        if !window.contains(&address) {
            return Err(BootError::OutOfBounds { address });
        }
        store(address, byte);
        next = address.checked_add(1);
        // Only wraps for a 4 GiB image starting at zero.
        len = len.wrapping_add(1);
    }
}

/// Checks that `payload` can be sent as-is.
pub fn check_payload(payload: &[u8]) -> Result<(), BootError> {
    match payload.iter().position(|&b| b == ETX) {
        Some(offset) => Err(BootError::EtxInPayload { offset }),
        None => Ok(()),
    }
}

/// Header bytes the host sends ahead of the payload.
pub fn header(address: u32) -> [u8; 6] {
    let a = address.to_le_bytes();
    [SOH, a[0], a[1], a[2], a[3], STX]
}
