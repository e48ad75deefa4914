//! Walking a history buffer: header, sentence records and their
//! substitution entries, in file order.

use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{HistoryError, Result, TextBlock, TextDecodeWarning};
use crate::filetime::filetime_to_timestamp;
use crate::header::FileHeader;
use crate::record::SentenceRecord;
use crate::substitution::Substitution;

/// One recovered conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    /// Timestamp of the sentence record the entry belongs to
    pub timestamp: Timestamp,
    /// The same timestamp as raw FILETIME ticks
    pub filetime: u64,
    /// Index of the sentence record
    pub record: u32,
    /// Index of the substitution entry inside its record
    pub entry: u8,
    pub source: TextBlock,
    /// Offset of the substitution entry in the buffer
    pub offset: usize,
    pub text: String,
}

/// Counters accumulated while walking the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub records: u32,
    pub substitutions: u64,
    pub lines: u64,
    pub bytes_consumed: usize,
    /// Bytes left after the last declared record
    pub trailing_bytes: usize,
}

/// A fully decoded history file.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub header: FileHeader,
    pub lines: Vec<HistoryLine>,
    pub warnings: Vec<TextDecodeWarning>,
    pub stats: DecodeStats,
}

/// Whatever could be recovered from a buffer, plus the fault that stopped
/// the walk early, if any.
#[derive(Debug)]
pub struct Recovery {
    pub history: History,
    pub fault: Option<HistoryError>,
}

struct OpenRecord {
    index: u32,
    filetime: u64,
    timestamp: Timestamp,
    next_entry: u8,
    entry_count: u8,
}

/// Streaming decoder yielding one line per non-empty substitution entry.
///
/// Every complete line before a decode fault is yielded, then the fault,
/// then the iterator is exhausted.
pub struct HistoryReader<'a> {
    cursor: ByteCursor<'a>,
    header: FileHeader,
    current: Option<OpenRecord>,
    warnings: Vec<TextDecodeWarning>,
    stats: DecodeStats,
    finished: bool,
}

impl<'a> HistoryReader<'a> {
    /// Read the file header and prepare to walk the records.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let header = FileHeader::read(&mut cursor)?;
        debug!(
            "Header: {} entries, used {} of {} bytes",
            header.entry_count, header.used_size, header.allocated_size
        );

        let stats = DecodeStats {
            bytes_consumed: cursor.position(),
            ..DecodeStats::default()
        };

        Ok(Self {
            cursor,
            header,
            current: None,
            warnings: Vec::new(),
            stats,
            finished: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    pub fn warnings(&self) -> &[TextDecodeWarning] {
        &self.warnings
    }

    fn open_record(&mut self) -> Result<OpenRecord> {
        let offset = self.cursor.position();
        let record = SentenceRecord::read(&mut self.cursor)?;
        let timestamp = filetime_to_timestamp(record.timestamp, offset)?;
        let index = self.stats.records;
        self.stats.records += 1;

        debug!(
            "Record {} at {:#x}: {} sub-entries in {} bytes, {}",
            index, offset, record.sub_entry_count, record.sub_block_size, timestamp
        );

        Ok(OpenRecord {
            index,
            filetime: record.timestamp,
            timestamp,
            next_entry: 0,
            entry_count: record.sub_entry_count,
        })
    }

    fn fail(&mut self, err: HistoryError) -> Option<Result<HistoryLine>> {
        self.finished = true;
        self.current = None;
        self.stats.bytes_consumed = self.cursor.position();
        Some(Err(err))
    }

    /// Stop iterating and collect the header, warnings and counters.
    pub fn finish(self, lines: Vec<HistoryLine>) -> History {
        History {
            header: self.header,
            lines,
            warnings: self.warnings,
            stats: self.stats,
        }
    }
}

impl Iterator for HistoryReader<'_> {
    type Item = Result<HistoryLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            match self.current.as_mut() {
                Some(open) if open.next_entry < open.entry_count => {
                    let entry = open.next_entry;
                    open.next_entry += 1;
                    let (record, filetime, timestamp) = (open.index, open.filetime, open.timestamp);

                    let substitution = match Substitution::read(&mut self.cursor) {
                        Ok(s) => s,
                        Err(err) => return self.fail(err),
                    };
                    self.stats.substitutions += 1;
                    self.stats.bytes_consumed = self.cursor.position();
                    self.warnings.extend(substitution.warnings.iter().cloned());

                    let (source, text) = substitution.selected();
                    if text.is_empty() {
                        continue;
                    }

                    self.stats.lines += 1;
                    return Some(Ok(HistoryLine {
                        timestamp,
                        filetime,
                        record,
                        entry,
                        source,
                        offset: substitution.offset,
                        text: text.to_string(),
                    }));
                }
                _ => {
                    self.current = None;
                }
            }

            if self.stats.records >= self.header.entry_count {
                self.finished = true;
                self.stats.trailing_bytes = self.cursor.remaining();
                if self.stats.trailing_bytes > 0 {
                    warn!(
                        "{} bytes follow the last of {} records",
                        self.stats.trailing_bytes, self.header.entry_count
                    );
                }
                return None;
            }

            match self.open_record() {
                Ok(open) => {
                    self.stats.bytes_consumed = self.cursor.position();
                    self.current = Some(open);
                }
                Err(err) => return self.fail(err),
            }
        }
    }
}

/// Decode a complete history buffer, failing on the first fault.
pub fn decode_history(data: &[u8]) -> Result<History> {
    let mut reader = HistoryReader::new(data)?;
    let lines = reader.by_ref().collect::<Result<Vec<_>>>()?;
    Ok(reader.finish(lines))
}

/// Decode as much of a history buffer as possible.
///
/// Only a truncated header is an error here; a fault later in the walk is
/// returned alongside the lines recovered before it.
pub fn recover_history(data: &[u8]) -> Result<Recovery> {
    let mut reader = HistoryReader::new(data)?;
    let mut lines = Vec::new();
    let mut fault = None;

    for line in reader.by_ref() {
        match line {
            Ok(line) => lines.push(line),
            Err(err) => fault = Some(err),
        }
    }

    Ok(Recovery {
        history: reader.finish(lines),
        fault,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::header::{HEADER_CONSTANT, HEADER_SIZE};
    use crate::record::RECORD_SIZE;
    use crate::substitution::PREFIX_SIZE;
    use proptest::prelude::*;

    pub const TEST_FILETIME: u64 = 132_000_000_000_000_000;

    pub fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    /// (input, result) pairs per record
    pub type TestRecord<'s> = (u64, Vec<(&'s str, &'s str)>);

    pub fn build_test_history(records: &[TestRecord<'_>]) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&TEST_FILETIME.to_le_bytes());
        buffer.extend_from_slice(&0x0010_0000u32.to_le_bytes()); // allocated size
        buffer.extend_from_slice(&0u32.to_le_bytes()); // flags
        buffer.extend_from_slice(&(records.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&HEADER_CONSTANT.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes()); // unknown
        buffer.extend_from_slice(&0u32.to_le_bytes()); // used size, patched below

        for (filetime, entries) in records {
            let mut block = Vec::new();
            for (input, result) in entries {
                let input = utf16(input);
                let result = utf16(result);
                let size = (PREFIX_SIZE + input.len() + result.len()) as u16;
                block.extend_from_slice(&size.to_le_bytes());
                block.push((result.len() / 2) as u8);
                block.push((input.len() / 2) as u8);
                block.extend_from_slice(&0u32.to_le_bytes()); // flags
                block.extend_from_slice(&input);
                block.extend_from_slice(&result);
            }

            buffer.extend_from_slice(&filetime.to_le_bytes());
            buffer.extend_from_slice(&((RECORD_SIZE + block.len()) as u16).to_le_bytes());
            buffer.extend_from_slice(&0x0010u16.to_le_bytes());
            buffer.push(0x01);
            buffer.push(entries.len() as u8);
            buffer.extend_from_slice(&0u16.to_le_bytes());
            buffer.extend_from_slice(&block);
        }

        let used = buffer.len() as u32;
        buffer[28..32].copy_from_slice(&used.to_le_bytes());
        buffer
    }

    #[test]
    fn test_two_entries_share_record_timestamp() {
        let buffer = build_test_history(&[(TEST_FILETIME, vec![("ABC", ""), ("", "ab")])]);
        let history = decode_history(&buffer).unwrap();

        assert_eq!(history.header.entry_count, 1);
        assert_eq!(history.lines.len(), 2);
        assert_eq!(history.lines[0].text, "ABC");
        assert_eq!(history.lines[0].source, TextBlock::Input);
        assert_eq!(history.lines[1].text, "ab");
        assert_eq!(history.lines[1].source, TextBlock::Result);
        assert_eq!(history.lines[0].timestamp, history.lines[1].timestamp);
        assert_eq!(history.lines[0].timestamp.to_string(), "2019-04-17T18:40:00Z");
        assert_eq!(history.lines[1].entry, 1);
    }

    #[test]
    fn test_empty_entry_produces_no_line() {
        let buffer = build_test_history(&[(TEST_FILETIME, vec![("", ""), ("x", "")])]);
        let history = decode_history(&buffer).unwrap();

        assert_eq!(history.stats.substitutions, 2);
        assert_eq!(history.lines.len(), 1);
        assert_eq!(history.lines[0].text, "x");
        assert_eq!(history.lines[0].entry, 1);
    }

    #[test]
    fn test_record_without_entries() {
        let buffer = build_test_history(&[
            (TEST_FILETIME, vec![]),
            (TEST_FILETIME + 10_000_000, vec![("きょう", "今日")]),
        ]);
        let history = decode_history(&buffer).unwrap();

        assert_eq!(history.stats.records, 2);
        assert_eq!(history.lines.len(), 1);
        assert_eq!(history.lines[0].record, 1);
        assert_eq!(history.lines[0].text, "今日");
        assert_eq!(history.lines[0].timestamp.to_string(), "2019-04-17T18:40:01Z");
    }

    #[test]
    fn test_zero_entry_count() {
        let buffer = build_test_history(&[]);
        let history = decode_history(&buffer).unwrap();
        assert!(history.lines.is_empty());
        assert_eq!(history.stats.bytes_consumed, HEADER_SIZE);
    }

    #[test]
    fn test_trailing_bytes_are_counted_not_read() {
        let mut buffer = build_test_history(&[(TEST_FILETIME, vec![("a", "")])]);
        let declared = buffer.len();
        buffer.extend_from_slice(&[0u8; 24]);

        let history = decode_history(&buffer).unwrap();
        assert_eq!(history.stats.bytes_consumed, declared);
        assert_eq!(history.stats.trailing_bytes, 24);
    }

    #[test]
    fn test_truncated_header_fails() {
        let buffer = build_test_history(&[(TEST_FILETIME, vec![("a", "")])]);
        assert!(matches!(
            decode_history(&buffer[..20]),
            Err(HistoryError::TruncatedInput { offset: 0, .. })
        ));
        assert!(matches!(
            recover_history(&buffer[..20]),
            Err(HistoryError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_missing_record_fails() {
        let mut buffer = build_test_history(&[(TEST_FILETIME, vec![("a", "")])]);
        // claim two records, provide one
        buffer[16..20].copy_from_slice(&2u32.to_le_bytes());
        let end = buffer.len();

        match decode_history(&buffer) {
            Err(HistoryError::TruncatedInput {
                context, offset, ..
            }) => {
                assert_eq!(context, "sentence record");
                assert_eq!(offset, end);
            }
            other => panic!("expected TruncatedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_text_yields_earlier_lines_first() {
        let buffer = build_test_history(&[
            (TEST_FILETIME, vec![("first", "")]),
            (TEST_FILETIME, vec![("second", ""), ("third", "")]),
        ]);
        let cut = &buffer[..buffer.len() - 3];

        let results: Vec<_> = HistoryReader::new(cut).unwrap().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().text, "first");
        assert_eq!(results[1].as_ref().unwrap().text, "second");
        assert!(matches!(
            results[2],
            Err(HistoryError::TruncatedInput {
                context: "input text",
                ..
            })
        ));

        let recovery = recover_history(cut).unwrap();
        assert_eq!(recovery.history.lines.len(), 2);
        assert!(recovery.fault.is_some());
        assert!(decode_history(cut).is_err());
    }

    #[test]
    fn test_reader_stops_after_fault() {
        let buffer = build_test_history(&[(TEST_FILETIME, vec![("abc", "")])]);
        let mut reader = HistoryReader::new(&buffer[..buffer.len() - 1]).unwrap();
        assert_eq!(reader.header().entry_count, 1);
        assert!(reader.next().unwrap().is_err());
        assert_eq!(reader.stats().records, 1);
        assert_eq!(reader.stats().substitutions, 0);
        assert!(reader.warnings().is_empty());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_bad_timestamp_keeps_earlier_records() {
        let buffer = build_test_history(&[
            (TEST_FILETIME, vec![("first", "")]),
            (u64::MAX, vec![("second", "")]),
        ]);

        let recovery = recover_history(&buffer).unwrap();
        assert_eq!(recovery.history.lines.len(), 1);
        assert_eq!(recovery.history.lines[0].text, "first");

        // header, one record, one entry with five code units
        let second_record = HEADER_SIZE + RECORD_SIZE + PREFIX_SIZE + 10;
        match recovery.fault {
            Some(HistoryError::TimestampOutOfRange { ticks, offset }) => {
                assert_eq!(ticks, u64::MAX);
                assert_eq!(offset, second_record);
            }
            other => panic!("expected TimestampOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_record_timestamp() {
        let buffer = build_test_history(&[(u64::MAX, vec![("abc", "")])]);
        assert!(matches!(
            decode_history(&buffer),
            Err(HistoryError::TimestampOutOfRange {
                offset: HEADER_SIZE,
                ..
            })
        ));
    }

    #[test]
    fn test_warnings_are_collected() {
        let mut buffer = build_test_history(&[(TEST_FILETIME, vec![("ab", "")])]);
        // turn 'b' into a lone low surrogate
        let at = buffer.len() - 2;
        buffer[at..].copy_from_slice(&[0x00, 0xdc]);

        let history = decode_history(&buffer).unwrap();
        assert_eq!(history.lines[0].text, "a\u{fffd}");
        assert_eq!(history.warnings.len(), 1);
        assert_eq!(history.warnings[0].block, TextBlock::Input);
    }

    fn entry_strategy() -> impl Strategy<Value = (String, String)> {
        ("[a-zあ-ん]{0,6}", "[A-Z漢字]{0,6}")
    }

    proptest! {
        #[test]
        fn prop_selection_and_byte_accounting(
            records in prop::collection::vec(prop::collection::vec(entry_strategy(), 0..5), 0..6)
        ) {
            let shaped: Vec<TestRecord<'_>> = records
                .iter()
                .map(|entries| {
                    (
                        TEST_FILETIME,
                        entries.iter().map(|(i, r)| (i.as_str(), r.as_str())).collect(),
                    )
                })
                .collect();
            let buffer = build_test_history(&shaped);
            let history = decode_history(&buffer).unwrap();

            let expected: Vec<&str> = records
                .iter()
                .flatten()
                .map(|(input, result)| if result.is_empty() { input.as_str() } else { result.as_str() })
                .filter(|text| !text.is_empty())
                .collect();
            let actual: Vec<&str> = history.lines.iter().map(|l| l.text.as_str()).collect();

            prop_assert_eq!(actual, expected);
            prop_assert_eq!(history.stats.records as usize, records.len());
            prop_assert_eq!(
                history.stats.substitutions as usize,
                records.iter().map(Vec::len).sum::<usize>()
            );

            let declared: usize = HEADER_SIZE
                + records
                    .iter()
                    .map(|entries| {
                        RECORD_SIZE
                            + entries
                                .iter()
                                .map(|(i, r)| PREFIX_SIZE + 2 * (i.encode_utf16().count() + r.encode_utf16().count()))
                                .sum::<usize>()
                    })
                    .sum::<usize>();
            prop_assert_eq!(history.stats.bytes_consumed, declared);
            prop_assert_eq!(history.stats.bytes_consumed, buffer.len());
        }
    }
}
