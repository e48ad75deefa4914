use byteorder::{ByteOrder, LittleEndian};

use crate::header::{HEADER_CONSTANT, HEADER_SIZE};

/// File name the IME uses for its prediction history
pub const HISTORY_FILE_NAME: &str = "JpnIHDS.dat";

/// Kinds of input the tool knows how to handle
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InputKind {
    ImeHistory, // 0x20 at header offset 20
    Zip,        // PK 03 04 / PK 05 06
    Unknown,
}

/// Whether a path or archive member name refers to a history file.
pub fn is_history_file_name(name: &str) -> bool {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.eq_ignore_ascii_case(HISTORY_FILE_NAME)
}

/// Detect the input kind based on magic bytes, header structure and filename
pub fn detect_input_kind(data: &[u8], filename: Option<&str>) -> InputKind {
    if data.len() >= 4 && (&data[0..4] == b"PK\x03\x04" || &data[0..4] == b"PK\x05\x06") {
        return InputKind::Zip;
    }

    // The format has no magic; the constant header field is the best signal
    if data.len() >= HEADER_SIZE && LittleEndian::read_u32(&data[20..24]) == HEADER_CONSTANT {
        return InputKind::ImeHistory;
    }

    if let Some(name) = filename {
        if is_history_file_name(name) {
            return InputKind::ImeHistory;
        }
        if name.to_ascii_lowercase().ends_with(".zip") {
            return InputKind::Zip;
        }
    }

    InputKind::Unknown
}

/// Get a human-readable name for an input kind
pub fn input_kind_name(kind: &InputKind) -> &'static str {
    match kind {
        InputKind::ImeHistory => "IME History",
        InputKind::Zip => "ZIP Archive",
        InputKind::Unknown => "Unknown",
    }
}
