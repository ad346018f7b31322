//! The 36-symbol shift transform.

use crate::cipher::key::ShiftKey;

/// Symbols affected by the transform, in shift order.
pub const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const ALPHABET_LEN: usize = ALPHABET.len();

fn index_of(c: char) -> Option<usize> {
    match c {
        'a'..='z' => Some(c as usize - 'a' as usize),
        '0'..='9' => Some(26 + c as usize - '0' as usize),
        _ => None,
    }
}

fn shift_str(text: &str, offset: usize) -> String {
    text.chars()
        .map(|c| match index_of(c) {
            Some(i) => ALPHABET[(i + offset) % ALPHABET_LEN] as char,
            None => c,
        })
        .collect()
}

/// Shift every in-alphabet character of `text` forward by `shift`.
pub fn encode(shift: ShiftKey, text: &str) -> String {
    shift_str(text, shift.offset())
}

/// Undo [`encode`] with the same key.
pub fn decode(shift: ShiftKey, text: &str) -> String {
    shift_str(text, ALPHABET_LEN - shift.offset() % ALPHABET_LEN)
}
