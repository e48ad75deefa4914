//! Pulling history files out of ZIP evidence bundles.

use std::io::{Cursor, Read};

use tracing::{debug, warn};
use zip::read::ZipArchive;

use crate::error::Result;
use crate::file_types::{detect_input_kind, is_history_file_name, InputKind};

/// A history file found inside an archive
#[derive(Debug)]
pub struct ArchiveMember {
    pub name: String,
    pub data: Vec<u8>,
}

/// Slice the data to include only up to the end of the ZIP's EOCD record.
/// Returns None if no EOCD marker is found.
///
/// Collection tools sometimes append padding or slack space after the
/// archive, which the ZIP reader would otherwise reject.
pub fn slice_to_eocd(data: &[u8]) -> Option<&[u8]> {
    const EOCD_SIZE: usize = 22;

    if data.len() < EOCD_SIZE {
        return None;
    }

    (0..=data.len() - EOCD_SIZE)
        .rev()
        .find(|&i| &data[i..i + 4] == b"PK\x05\x06")
        .map(|i| {
            let comment_len = u16::from_le_bytes([data[i + 20], data[i + 21]]) as usize;
            let end = i + EOCD_SIZE + comment_len;
            &data[..end.min(data.len())]
        })
}

/// Preallocation for a member, bounded by the archive's own size since the
/// declared uncompressed size cannot be trusted.
fn capacity_hint(declared: u64, archive_len: usize) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(archive_len)
}

/// Read every member of the archive that is, or looks like, a history file.
pub fn history_members(data: &[u8]) -> Result<Vec<ArchiveMember>> {
    let zip_slice = slice_to_eocd(data).unwrap_or(data);
    let mut archive = ZipArchive::new(Cursor::new(zip_slice))?;
    debug!("Archive contains {} entries", archive.len());

    let mut members = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();

        // Skip directories
        if file.is_dir() {
            continue;
        }

        let mut contents = Vec::with_capacity(capacity_hint(file.size(), data.len()));
        if let Err(e) = file.read_to_end(&mut contents) {
            warn!("Skipping archive entry {}: {}", name, e);
            continue;
        }

        if is_history_file_name(&name)
            || detect_input_kind(&contents, Some(&name)) == InputKind::ImeHistory
        {
            debug!("Found history file {} ({} bytes)", name, contents.len());
            members.push(ArchiveMember {
                name,
                data: contents,
            });
        }
    }

    Ok(members)
}
