//! Incremental UTF-8 decoding for relayed chunks.
//!
//! Upstream chunk boundaries do not respect code point boundaries, so a
//! multi-byte character may arrive split across two reads. The decoder holds
//! the incomplete tail back until the rest arrives. Invalid sequences decode
//! to U+FFFD.

/// Stateful decoder carrying an incomplete trailing code point between chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. May return an empty string when the chunk only
    /// contained the start of a code point.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut pieces = buf.utf8_chunks().peekable();
        while let Some(piece) = pieces.next() {
            out.push_str(piece.valid());
            let invalid = piece.invalid();
            if invalid.is_empty() {
                continue;
            }
            if pieces.peek().is_none() && is_truncated(invalid) {
                self.pending = invalid.to_vec();
            } else {
                out.push(char::REPLACEMENT_CHARACTER);
            }
        }
        out
    }

    /// Flush whatever is still held back once the input has ended.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// True while an incomplete code point is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// True when `seq` is the start of a code point cut short by end of input.
///
/// `seq` is an invalid run as reported by `utf8_chunks`, i.e. the longest
/// prefix of a well-formed sequence, so a lead byte announcing more bytes
/// than are present can only mean the input ended early.
fn is_truncated(seq: &[u8]) -> bool {
    let width = match seq[0] {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    };
    seq.len() < width
}
