use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::warn;

use crate::cursor::ByteCursor;
use crate::error::Result;

/// Size of the file header in bytes
pub const HEADER_SIZE: usize = 32;

/// Value every observed file carries at header offset 20
pub const HEADER_CONSTANT: u32 = 0x20;

/// Fixed 32-byte header at the start of a `JpnIHDS.dat` file.
///
/// Layout (little-endian):
/// - 0..8   timestamp (FILETIME)
/// - 8..12  allocated size
/// - 12..16 flags
/// - 16..20 entry count
/// - 20..24 constant, 0x20
/// - 24..28 unknown
/// - 28..32 used size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub timestamp: u64,
    pub allocated_size: u32,
    pub flags: u32,
    pub entry_count: u32,
    pub constant: u32,
    pub unknown1: u32,
    pub used_size: u32,
}

impl FileHeader {
    /// Decode the header fields from their fixed offsets.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            timestamp: LittleEndian::read_u64(&bytes[0..8]),
            allocated_size: LittleEndian::read_u32(&bytes[8..12]),
            flags: LittleEndian::read_u32(&bytes[12..16]),
            entry_count: LittleEndian::read_u32(&bytes[16..20]),
            constant: LittleEndian::read_u32(&bytes[20..24]),
            unknown1: LittleEndian::read_u32(&bytes[24..28]),
            used_size: LittleEndian::read_u32(&bytes[28..32]),
        }
    }

    /// Read the header from the cursor, which must sit at offset 0.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let header = Self::parse(cursor.take_array::<HEADER_SIZE>("file header")?);

        if header.constant != HEADER_CONSTANT {
            warn!(
                "Header constant is {:#x}, expected {:#x}; decoding anyway",
                header.constant, HEADER_CONSTANT
            );
        }

        Ok(header)
    }
}
