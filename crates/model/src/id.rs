//! Generated unique ids for per-instance save files.

/// Alphabet without visually ambiguous characters (`I`, `O`, `l`, `0`, `1`).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub const ID_LENGTH: usize = 12;

/// A fresh `NanoID` over [`SAFE_ALPHABET`]; safe to embed in file names.
#[must_use]
pub fn unique_id() -> String {
    nanoid::nanoid!(ID_LENGTH, SAFE_ALPHABET)
}
