use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::archive::history_members;
use crate::error::{HistoryError, Result};
use crate::file_types::{detect_input_kind, input_kind_name, InputKind};
use crate::history::{recover_history, History};
use crate::report::hexdump_around;

/// A decode fault together with the bytes surrounding it
#[derive(Debug)]
pub struct SourceFault {
    pub error: HistoryError,
    /// Hexdump of the bytes around the fault offset, when there is one
    pub context: Option<String>,
}

impl SourceFault {
    fn new(error: HistoryError, data: &[u8]) -> Self {
        let context = error.offset().map(|offset| hexdump_around(data, offset, 2));
        Self { error, context }
    }
}

/// Everything recovered from one history file
#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    /// None when not even the header could be read
    pub history: Option<History>,
    pub fault: Option<SourceFault>,
}

/// Read and decode the file at `path`: a history file or a ZIP archive
/// holding one or more of them.
pub fn process_path(path: &Path) -> Result<Vec<SourceReport>> {
    if !path.exists() {
        return Err(HistoryError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let data = fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("input");

    process_bytes(&data, name)
}

/// Decode an in-memory input based on its detected kind
pub fn process_bytes(data: &[u8], name: &str) -> Result<Vec<SourceReport>> {
    let kind = detect_input_kind(data, Some(name));
    info!(
        "[{}] {} ({} bytes)",
        input_kind_name(&kind),
        name,
        data.len()
    );

    match kind {
        InputKind::ImeHistory => Ok(vec![decode_source(name, data)]),
        InputKind::Zip => {
            let members = history_members(data)?;
            if members.is_empty() {
                return Err(HistoryError::NoHistoryInArchive {
                    name: name.to_string(),
                });
            }
            info!("  → Found {} history files", members.len());
            Ok(members
                .iter()
                .map(|member| decode_source(&member.name, &member.data))
                .collect())
        }
        InputKind::Unknown => {
            warn!(
                "{} does not look like an IME history file; decoding anyway",
                name
            );
            Ok(vec![decode_source(name, data)])
        }
    }
}

fn decode_source(name: &str, data: &[u8]) -> SourceReport {
    match recover_history(data) {
        Ok(recovery) => {
            let stats = &recovery.history.stats;
            info!(
                "{}: {} records, {} entries, {} lines, {} bytes consumed",
                name, stats.records, stats.substitutions, stats.lines, stats.bytes_consumed
            );
            SourceReport {
                name: name.to_string(),
                history: Some(recovery.history),
                fault: recovery.fault.map(|e| SourceFault::new(e, data)),
            }
        }
        Err(e) => SourceReport {
            name: name.to_string(),
            history: None,
            fault: Some(SourceFault::new(e, data)),
        },
    }
}
