use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::Result;

/// Size of a sentence record prefix in bytes
pub const RECORD_SIZE: usize = 16;

/// One IME input session: a timestamp shared by `sub_entry_count`
/// substitution entries that follow the 16-byte prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentenceRecord {
    /// FILETIME of the session
    pub timestamp: u64,
    pub sub_block_size: u16,
    pub constant: u16,
    pub constant_byte: u8,
    pub sub_entry_count: u8,
    pub trailing_constant: u16,
}

impl SentenceRecord {
    pub fn parse(bytes: &[u8; RECORD_SIZE]) -> Self {
        Self {
            timestamp: LittleEndian::read_u64(&bytes[0..8]),
            sub_block_size: LittleEndian::read_u16(&bytes[8..10]),
            constant: LittleEndian::read_u16(&bytes[10..12]),
            constant_byte: bytes[12],
            sub_entry_count: bytes[13],
            trailing_constant: LittleEndian::read_u16(&bytes[14..16]),
        }
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self::parse(cursor.take_array::<RECORD_SIZE>("sentence record")?))
    }
}
