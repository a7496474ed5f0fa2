//! `Range` header parsing for single byte ranges

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Why a range header was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range header not parseable")]
    NotParseable,
    #[error("range not satisfiable")]
    NotSatisfiable,
}

impl ByteRange {
    /// Parse `bytes=<start>-<end>` where `<end>` may be omitted
    ///
    /// Only the first range of a multi-range header is honored.
    ///
    /// # Arguments
    /// * `header` - Raw header value
    /// * `file_size` - Size of the file being served
    ///
    /// # Returns
    /// * `Err(RangeError::NotParseable)` if the header is not of that form
    /// * `Err(RangeError::NotSatisfiable)` if `start > end` or `end >= file_size`
    pub fn parse(header: &str, file_size: u64) -> Result<Self, RangeError> {
        let ranges = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or(RangeError::NotParseable)?;

        let first = ranges.split(',').next().unwrap_or_default().trim();
        let (start, end) = first.split_once('-').ok_or(RangeError::NotParseable)?;

        let start = parse_digits(start)?;
        let end = if end.is_empty() {
            file_size.checked_sub(1).ok_or(RangeError::NotSatisfiable)?
        } else {
            parse_digits(end)?
        };

        if start > end || end >= file_size {
            return Err(RangeError::NotSatisfiable);
        }

        Ok(Self { start, end })
    }

    /// Number of bytes covered by the range
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for this range
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

fn parse_digits(s: &str) -> Result<u64, RangeError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::NotParseable);
    }
    s.parse().map_err(|_| RangeError::NotParseable)
}
