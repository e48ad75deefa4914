use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::UTF_16LE;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{Result, TextBlock, TextDecodeWarning};

/// Size of a substitution entry prefix in bytes
pub const PREFIX_SIZE: usize = 8;

/// Fixed 8-byte prefix of a substitution entry.
///
/// Both lengths count UTF-16 code units, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubstitutionPrefix {
    /// Declared size of the entry, not used for decoding
    pub struct_size: u16,
    pub result_len: u8,
    pub input_len: u8,
    pub flags: u32,
}

impl SubstitutionPrefix {
    pub fn parse(bytes: &[u8; PREFIX_SIZE]) -> Self {
        Self {
            struct_size: LittleEndian::read_u16(&bytes[0..2]),
            result_len: bytes[2],
            input_len: bytes[3],
            flags: LittleEndian::read_u32(&bytes[4..8]),
        }
    }

    /// Bytes taken by the two text blocks following the prefix.
    pub fn text_size(&self) -> usize {
        (usize::from(self.input_len) + usize::from(self.result_len)) * 2
    }
}

/// A decoded substitution entry: the raw typed input and the committed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub prefix: SubstitutionPrefix,
    /// Offset of the prefix in the buffer
    pub offset: usize,
    pub input_text: String,
    pub result_text: String,
    pub warnings: Vec<TextDecodeWarning>,
}

impl Substitution {
    /// Read the prefix and both text blocks (input first, then result).
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.position();
        let prefix = SubstitutionPrefix::parse(cursor.take_array::<PREFIX_SIZE>("substitution entry")?);
        debug!(
            "Substitution at {:#x}: declared {} bytes, {} text bytes, flags {:#x}",
            offset,
            prefix.struct_size,
            prefix.text_size(),
            prefix.flags
        );
        let mut warnings = Vec::new();

        let input_offset = cursor.position();
        let input_bytes = cursor.take(usize::from(prefix.input_len) * 2, "input text")?;
        let input_text = decode_utf16le(input_bytes, input_offset, TextBlock::Input, &mut warnings);

        let result_offset = cursor.position();
        let result_bytes = cursor.take(usize::from(prefix.result_len) * 2, "result text")?;
        let result_text =
            decode_utf16le(result_bytes, result_offset, TextBlock::Result, &mut warnings);

        Ok(Self {
            prefix,
            offset,
            input_text,
            result_text,
            warnings,
        })
    }

    /// The text this entry contributes to the history.
    ///
    /// The committed result wins whenever one was recorded; the raw input is
    /// used only for entries with no result block at all.
    pub fn selected(&self) -> (TextBlock, &str) {
        if self.prefix.result_len == 0 {
            (TextBlock::Input, &self.input_text)
        } else {
            (TextBlock::Result, &self.result_text)
        }
    }
}

/// Decode UTF-16LE, replacing malformed sequences with U+FFFD.
fn decode_utf16le(
    bytes: &[u8],
    offset: usize,
    block: TextBlock,
    warnings: &mut Vec<TextDecodeWarning>,
) -> String {
    let (text, had_errors) = UTF_16LE.decode_without_bom_handling(bytes);

    if had_errors {
        // U+FFFD already present in the source is not a replacement
        let genuine = bytes
            .chunks_exact(2)
            .filter(|unit| LittleEndian::read_u16(unit) == 0xfffd)
            .count();
        let replaced = text
            .chars()
            .filter(|&c| c == char::REPLACEMENT_CHARACTER)
            .count()
            .saturating_sub(genuine);

        warn!(
            "Malformed UTF-16 in {:?} text at offset {:#x}: {} replacement(s)",
            block, offset, replaced
        );
        warnings.push(TextDecodeWarning {
            offset,
            block,
            replaced,
        });
    }

    text.into_owned()
}
