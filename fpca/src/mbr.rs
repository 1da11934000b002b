//! Master boot record partition table, as found in block 0 of an SD card.

use ufmt::derive::uDebug;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, LayoutVerified, Unaligned};

pub const SECTOR_SIZE: usize = 512;

const TABLE_OFFSET: usize = 446;
const SIGNATURE: [u8; 2] = [0x55, 0xAA];

#[derive(FromBytes, Unaligned)]
#[repr(C)]
struct RawPartition {
    status: u8,
    _chs_first: [u8; 3],
    kind: u8,
    _chs_last: [u8; 3],
    first_lba: U32<LittleEndian>,
    sectors: U32<LittleEndian>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum MbrError {
    /// The last two bytes of the sector weren't `55 AA`.
    BadSignature { found: u16 },
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, uDebug)]
pub struct Partition {
    /// `0x80` for the active partition, `0x00` otherwise.
    pub status: u8,
    /// Partition type; zero means the slot is unused.
    pub kind: u8,
    pub first_lba: u32,
    pub sectors: u32,
}

impl Partition {
    pub fn is_used(&self) -> bool {
        self.kind != 0
    }

    pub fn is_bootable(&self) -> bool {
        self.status & 0x80 != 0
    }

    /// One of the FAT12/16/32 partition types.
    pub fn is_fat(&self) -> bool {
        matches!(self.kind, 0x01 | 0x04 | 0x06 | 0x0B | 0x0C | 0x0E)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mbr {
    pub partitions: [Partition; 4],
}

impl Mbr {
    pub fn parse(sector: &[u8; SECTOR_SIZE]) -> Result<Self, MbrError> {
        let signature = [sector[SECTOR_SIZE - 2], sector[SECTOR_SIZE - 1]];
        if signature != SIGNATURE {
            return Err(MbrError::BadSignature { found: u16::from_be_bytes(signature) });
        }

        let mut partitions = [Partition::default(); 4];
        let table = &sector[TABLE_OFFSET..SECTOR_SIZE - 2];
        // A 64-byte table is always exactly four unaligned 16-byte entries.
        if let Some(raw) = LayoutVerified::<_, [RawPartition]>::new_slice_unaligned(table) {
            for (p, r) in partitions.iter_mut().zip(raw.iter()) {
                *p = Partition {
                    status: r.status,
                    kind: r.kind,
                    first_lba: r.first_lba.get(),
                    sectors: r.sectors.get(),
                };
            }
        }
        Ok(Self { partitions })
    }

    pub fn used(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| p.is_used())
    }
}
