use crate::error::{HistoryError, Result};

/// Forward-only, bounds-checked view over a history buffer.
///
/// Every read either returns exactly the requested number of bytes and
/// advances, or fails with `TruncatedInput` and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes, naming `context` in the error if they are missing.
    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(HistoryError::truncated(context, self.pos, len, available));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Take a fixed-size block, e.g. a 16-byte record prefix.
    pub fn take_array<const N: usize>(&mut self, context: &'static str) -> Result<&'a [u8; N]> {
        let rest = &self.data[self.pos..];
        let (block, _) = rest
            .split_first_chunk::<N>()
            .ok_or_else(|| HistoryError::truncated(context, self.pos, N, rest.len()))?;
        self.pos += N;
        Ok(block)
    }
}
