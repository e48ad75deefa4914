use std::fmt::Write;

use jiff::tz::TimeZone;
use serde::Serialize;

use crate::config::ReportOptions;
use crate::error::{HistoryError, Result, TextBlock, TextDecodeWarning};
use crate::filetime::format_line_time;
use crate::header::FileHeader;
use crate::history::{DecodeStats, HistoryLine};
use crate::processor::SourceReport;

#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Format a single report line: `<YYYY/MM/DD> <hh:mm:ss> <text>`
pub fn format_line(line: &HistoryLine, tz: &TimeZone) -> String {
    format!("{} {}", format_line_time(line.timestamp, tz), line.text)
}

/// Render the plain text report.
///
/// A single source renders as bare lines; several sources (from an archive)
/// are separated by a `== name ==` banner.
pub fn render_text(reports: &[SourceReport], options: &ReportOptions) -> String {
    let mut out = String::new();
    let banners = reports.len() > 1;

    for report in reports {
        if banners {
            let _ = write!(out, "== {} =={}", report.name, LINE_ENDING);
        }
        let Some(history) = &report.history else {
            continue;
        };
        if options.strict && report.fault.is_some() {
            continue;
        }
        for line in &history.lines {
            out.push_str(&format_line(line, &options.time_zone));
            out.push_str(LINE_ENDING);
        }
    }

    out
}

#[derive(Serialize)]
struct JsonLine<'a> {
    time: String,
    #[serde(flatten)]
    line: &'a HistoryLine,
}

#[derive(Serialize)]
struct JsonFault {
    kind: &'static str,
    message: String,
    offset: Option<usize>,
}

#[derive(Serialize)]
struct JsonSource<'a> {
    name: &'a str,
    header: Option<&'a FileHeader>,
    lines: Vec<JsonLine<'a>>,
    warnings: &'a [TextDecodeWarning],
    stats: Option<&'a DecodeStats>,
    fault: Option<JsonFault>,
}

/// Render the JSON report, one object per source.
pub fn render_json(reports: &[SourceReport], options: &ReportOptions) -> Result<String> {
    let sources: Vec<JsonSource<'_>> = reports
        .iter()
        .map(|report| {
            let history = report.history.as_ref();
            let keep_lines = !(options.strict && report.fault.is_some());
            JsonSource {
                name: &report.name,
                header: history.map(|h| &h.header),
                lines: history
                    .filter(|_| keep_lines)
                    .map(|h| {
                        h.lines
                            .iter()
                            .map(|line| JsonLine {
                                time: format_line_time(line.timestamp, &options.time_zone),
                                line,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                warnings: history.map(|h| h.warnings.as_slice()).unwrap_or(&[]),
                stats: history.map(|h| &h.stats),
                fault: report.fault.as_ref().map(|f| JsonFault {
                    kind: f.error.kind(),
                    message: f.error.to_string(),
                    offset: f.error.offset(),
                }),
            }
        })
        .collect();

    Ok(serde_json::to_string_pretty(&sources)?)
}

/// Render a fault as plain text: kind, message and the bytes around it.
pub fn render_failure(source: Option<&str>, error: &HistoryError, context: Option<&str>) -> String {
    let mut out = String::new();

    // Keep the one-line message for a missing file
    if let HistoryError::FileNotFound { .. } = error {
        let _ = write!(out, "Failed to read IME history: {}", error);
        return out;
    }

    match source {
        Some(name) => {
            let _ = write!(out, "{}: {}: {}", name, error.kind(), error);
        }
        None => {
            let _ = write!(out, "{}: {}", error.kind(), error);
        }
    }
    if let Some(context) = context {
        out.push_str(LINE_ENDING);
        out.push_str(context);
    }
    out
}

/// Summarize how many lines came from each text block and how many
/// warnings were raised, per source
pub fn summarize_sources(reports: &[SourceReport]) -> String {
    let mut out = String::new();

    for report in reports {
        let Some(history) = &report.history else {
            let _ = write!(out, "{}: no header{}", report.name, LINE_ENDING);
            continue;
        };
        let from_input = history
            .lines
            .iter()
            .filter(|l| l.source == TextBlock::Input)
            .count();
        let _ = write!(
            out,
            "{}: {} lines ({} result, {} input), {} warnings, {}{}",
            report.name,
            history.lines.len(),
            history.lines.len() - from_input,
            from_input,
            history.warnings.len(),
            if report.fault.is_some() {
                "incomplete"
            } else {
                "complete"
            },
            LINE_ENDING
        );
    }

    out
}

/// Hexdump the rows around `offset`, `radius` rows either side.
///
/// The row containing the offset is marked with `>`.
pub fn hexdump_around(data: &[u8], offset: usize, radius: usize) -> String {
    let fault_row = offset / 16;
    let first_row = fault_row.saturating_sub(radius);
    let start = first_row * 16;
    let end = ((fault_row + radius + 1) * 16).min(data.len());

    let mut out = String::new();
    if start >= end {
        let _ = write!(out, "> {:08x}  <end of data, {} bytes>", offset, data.len());
        return out;
    }

    for (row, chunk) in data[start..end].chunks(16).enumerate() {
        let row_offset = start + row * 16;
        let marker = if row_offset / 16 == fault_row { '>' } else { ' ' };
        let _ = write!(out, "{} {:08x}  ", marker, row_offset);

        for i in 0..16 {
            if i < chunk.len() {
                let _ = write!(out, "{:02x} ", chunk[i]);
            } else {
                out.push_str("   ");
            }

            if i == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        for &b in chunk {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            out.push(c);
        }
        out.push('|');
        out.push_str(LINE_ENDING);
    }

    if end <= offset {
        let _ = write!(out, "> {:08x}  <end of data>{}", offset, LINE_ENDING);
    }

    out.truncate(out.trim_end().len());
    out
}
