//! The 32-symbol geohash alphabet.
//!
//! Digits and lowercase letters without `a`, `i`, `l` and `o`. Symbols sort in
//! the same order as their values, so lexicographic order of hashes matches
//! the order of their bit strings.

/// Number of bits carried by one base-32 symbol.
pub const BITS_PER_CHAR: u32 = 5;

pub const BASE32_CHARS: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Sorts after every alphabet symbol; used to build open upper bounds.
pub const RANGE_SENTINEL: char = '~';

const INVALID: u8 = u8::MAX;

const DECODE_TABLE: [u8; 128] = {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < BASE32_CHARS.len() {
        table[BASE32_CHARS[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Symbol for a 5-bit value, `None` when `value > 31`.
#[inline]
pub fn char_for(value: u8) -> Option<char> {
    BASE32_CHARS.get(value as usize).map(|&b| b as char)
}

/// Value of a symbol, `None` when it is not in the alphabet.
#[inline]
pub fn value_of(symbol: u8) -> Option<u8> {
    match DECODE_TABLE.get(symbol as usize) {
        Some(&INVALID) | None => None,
        Some(&value) => Some(value),
    }
}

pub fn is_valid(value: &str) -> bool {
    value.bytes().all(|b| value_of(b).is_some())
}
