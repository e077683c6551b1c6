//! Seek instructions and decoding of the core's two-word seek offset.

/// What the feed loop does after a chunk was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekInstruction {
    /// Keep reading at the next sequential offset.
    Continue,
    /// Re-position at this absolute offset.
    SeekTo(u64),
    /// No further data is needed.
    Done,
}

const WORD: i64 = 1 << 32;

/// Rebuilds a seek target from the core's `(low, high)` 32-bit words.
///
/// `(-1, -1)` means no seek is pending, which ends feeding. A negative `low`
/// carries the unsigned low word with its top bit set, so `2^32` is added back.
/// Targets that still come out negative (only possible with a negative `high`)
/// cannot be honoured and also end feeding.
pub fn decode_seek_words(low: i32, high: i32) -> SeekInstruction {
    if low == -1 && high == -1 {
        return SeekInstruction::Done;
    }
    let low = i64::from(low);
    let high = i64::from(high);
    let offset = if low < 0 {
        low + WORD + high * WORD
    } else {
        low + high * WORD
    };
    match u64::try_from(offset) {
        Ok(offset) => SeekInstruction::SeekTo(offset),
        Err(_) => SeekInstruction::Done,
    }
}

/// Splits an offset into the `(low, high)` words [`decode_seek_words`] expects.
pub fn encode_seek_words(offset: u64) -> (i32, i32) {
    (offset as u32 as i32, (offset >> 32) as u32 as i32)
}
