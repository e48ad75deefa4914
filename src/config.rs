//! Run configuration: where to read from and how to render the report.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use jiff::tz::TimeZone;

use crate::error::{HistoryError, Result};

/// Environment variable holding the roaming application data directory
pub const APPDATA_VAR: &str = "APPDATA";

/// Location of the history file below the roaming application data directory
pub const DEFAULT_RELATIVE_PATH: [&str; 4] = ["Microsoft", "InputMethod", "Shared", "JpnIHDS.dat"];

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `<date> <time> <text>` line per entry
    #[default]
    Text,
    /// Pretty-printed JSON document with provenance and statistics
    Json,
}

/// Options consumed by the processor and the report renderers
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Zone used to render line timestamps
    pub time_zone: TimeZone,
    /// Discard partially recovered lines when a decode fault occurs
    pub strict: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            time_zone: TimeZone::UTC,
            strict: false,
        }
    }
}

/// Pick the zone line timestamps are shown in.
///
/// `--utc` wins over `--tz`; with neither, the system zone is used, since the
/// IME itself records sessions that users read in local time.
pub fn resolve_time_zone(utc: bool, name: Option<&str>) -> Result<TimeZone> {
    if utc {
        return Ok(TimeZone::UTC);
    }
    match name {
        Some(name) => TimeZone::get(name).map_err(|e| HistoryError::UnknownTimeZone {
            name: name.to_string(),
            message: e.to_string(),
        }),
        None => Ok(TimeZone::system()),
    }
}

/// Resolve the input path, falling back to the per-user default location
/// when none (or only whitespace) is given.
pub fn resolve_input_path(arg: Option<&Path>) -> Result<PathBuf> {
    resolve_input_path_with(arg, std::env::var_os(APPDATA_VAR))
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.to_str().is_some_and(|s| s.trim().is_empty())
}

fn resolve_input_path_with(arg: Option<&Path>, appdata: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = arg.filter(|p| !is_blank(p)) {
        return Ok(path.to_path_buf());
    }

    let appdata = appdata
        .filter(|dir| !dir.is_empty())
        .ok_or(HistoryError::MissingDefaultLocation { var: APPDATA_VAR })?;

    let mut path = PathBuf::from(appdata);
    path.extend(DEFAULT_RELATIVE_PATH);
    Ok(path)
}
