//! Shared storage types

use serde::{Deserialize, Serialize};

/// Byte range into a blob
///
/// Held half-open internally. On the wire it is written as an inclusive
/// `{start, end}` pair where `end` is the index of the last byte, so an empty
/// range at `pos` is written as `{pos, pos - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "InclusiveRange", try_from = "InclusiveRange")]
pub struct ByteRange {
    start: u64,
    end: u64,
}

#[derive(Serialize, Deserialize)]
struct InclusiveRange {
    start: u64,
    end: i64,
}

impl From<ByteRange> for InclusiveRange {
    fn from(range: ByteRange) -> Self {
        Self {
            start: range.start,
            end: range.end as i64 - 1,
        }
    }
}

impl TryFrom<InclusiveRange> for ByteRange {
    type Error = String;

    fn try_from(wire: InclusiveRange) -> Result<Self, Self::Error> {
        let end = wire.end + 1;
        if end < 0 || (end as u64) < wire.start {
            return Err(format!(
                "byte range end {} precedes start {}",
                wire.end, wire.start
            ));
        }
        Ok(Self {
            start: wire.start,
            end: end as u64,
        })
    }
}

impl ByteRange {
    /// Range covering `len` bytes starting at `start`
    pub fn spanning(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Range from `first` through `last`, both included
    pub fn inclusive(first: u64, last: u64) -> Self {
        Self::spanning(first, (last + 1).saturating_sub(first))
    }

    /// Offset of the first byte
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice `bytes` by this range, `None` if it falls outside
    pub fn slice<'a>(&self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        let start = usize::try_from(self.start).ok()?;
        let end = usize::try_from(self.end).ok()?;
        bytes.get(start..end)
    }
}
