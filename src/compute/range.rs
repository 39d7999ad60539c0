//! Inclusive geohash ranges used as scan bounds.

use super::base32::{self, BITS_PER_CHAR, RANGE_SENTINEL};
use super::geohash::{GeoHash, MAX_PRECISION_BITS};
use crate::error::{GeoRangeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive `[start, end]` pair of sort keys.
///
/// `end` is either a geohash or a geohash prefix followed by
/// [`RANGE_SENTINEL`], which sorts after every string sharing that prefix.
/// Ranges compare and hash by value, so two independently planned ranges with
/// the same bounds are the same range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoHashRange {
    start: String,
    end: String,
}

impl GeoHashRange {
    pub fn new(start: GeoHash, end: GeoHash) -> Result<Self> {
        if start > end {
            return Err(GeoRangeError::InvalidInput(format!(
                "Range start {start} sorts after end {end}"
            )));
        }
        Ok(Self {
            start: start.into_string(),
            end: end.into_string(),
        })
    }

    /// Every key starting with `prefix`.
    pub fn prefixed(prefix: &GeoHash) -> Self {
        Self {
            start: prefix.as_str().to_string(),
            end: format!("{prefix}{RANGE_SENTINEL}"),
        }
    }

    /// The range of all hashes sharing the first `bits` bits of `hash`.
    ///
    /// The hash is cut to `ceil(bits / 5)` symbols and its last symbol is
    /// rounded down to the bits that remain significant. The end bound is the
    /// next cell at that bit depth, or an open bound when the last symbol
    /// would overflow the alphabet.
    pub fn for_bits(hash: &GeoHash, bits: u32) -> Self {
        let bits = bits.clamp(1, MAX_PRECISION_BITS);
        let precision = bits.div_ceil(BITS_PER_CHAR) as usize;
        let value = hash.as_str();
        if value.len() < precision {
            return Self::prefixed(hash);
        }

        let (base, last) = value[..precision].split_at(precision - 1);
        let last_value = last
            .bytes()
            .next()
            .and_then(base32::value_of)
            .unwrap_or_default();
        let significant_bits = bits - (base.len() as u32 * BITS_PER_CHAR);
        let unused_bits = BITS_PER_CHAR - significant_bits;

        let start_value = (last_value >> unused_bits) << unused_bits;
        let end_value = start_value + (1 << unused_bits);

        let mut start = String::with_capacity(precision);
        start.push_str(base);
        start.push(base32::char_for(start_value).unwrap_or(RANGE_SENTINEL));

        let mut end = String::with_capacity(precision);
        end.push_str(base);
        end.push(base32::char_for(end_value).unwrap_or(RANGE_SENTINEL));

        Self { start, end }
    }

    #[inline]
    pub fn start(&self) -> &str {
        &self.start
    }

    #[inline]
    pub fn end(&self) -> &str {
        &self.end
    }

    /// True when `key` falls within the inclusive bounds.
    pub fn contains(&self, key: &str) -> bool {
        self.start.as_str() <= key && key <= self.end.as_str()
    }

    /// Overlapping or touching ranges can be replaced by their union.
    pub fn can_merge_with(&self, other: &GeoHashRange) -> bool {
        self.is_super_range_of(other)
            || other.is_super_range_of(self)
            || self.is_prefix_of(other)
            || other.is_prefix_of(self)
    }

    fn is_super_range_of(&self, other: &GeoHashRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// `self` starts first and runs into `other` without covering its end.
    fn is_prefix_of(&self, other: &GeoHashRange) -> bool {
        self.start < other.start && self.end >= other.start && self.end < other.end
    }

    fn merged(&self, other: &GeoHashRange) -> Option<GeoHashRange> {
        if self.is_super_range_of(other) {
            Some(self.clone())
        } else if other.is_super_range_of(self) {
            Some(other.clone())
        } else if self.is_prefix_of(other) {
            Some(Self {
                start: self.start.clone(),
                end: other.end.clone(),
            })
        } else if other.is_prefix_of(self) {
            Some(Self {
                start: other.start.clone(),
                end: self.end.clone(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for GeoHashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Replaces mergeable pairs by their union until none are left.
///
/// The result is sorted, free of duplicates, and no two of its ranges
/// overlap or touch.
pub fn merge_ranges<I>(ranges: I) -> Vec<GeoHashRange>
where
    I: IntoIterator<Item = GeoHashRange>,
{
    let mut ranges: Vec<GeoHashRange> = ranges.into_iter().collect();
    ranges.sort_unstable();
    ranges.dedup();

    while let Some((i, j)) = first_mergeable(&ranges) {
        let Some(merged) = ranges[i].merged(&ranges[j]) else {
            unreachable!("ranges {} and {} cannot be merged", ranges[i], ranges[j]);
        };
        // j > i, so removing j first keeps i valid.
        ranges.swap_remove(j);
        ranges.swap_remove(i);
        ranges.push(merged);
        ranges.sort_unstable();
        ranges.dedup();
    }

    ranges
}

fn first_mergeable(ranges: &[GeoHashRange]) -> Option<(usize, usize)> {
    for (i, range) in ranges.iter().enumerate() {
        for (j, other) in ranges.iter().enumerate().skip(i + 1) {
            if range.can_merge_with(other) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(value: &str) -> GeoHash {
        GeoHash::new(value).unwrap()
    }

    fn range(start: &str, end: &str) -> GeoHashRange {
        GeoHashRange::new(hash(start), hash(end)).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        assert!(GeoHashRange::new(hash("9q9"), hash("9q8")).is_err());
        assert!(GeoHashRange::new(hash("9q8"), hash("9q8")).is_ok());
    }

    #[test]
    fn test_for_bits_on_symbol_boundary() {
        // 15 bits: three full symbols, end is the next third symbol.
        let r = GeoHashRange::for_bits(&hash("9q8yyk8ytp"), 15);
        assert_eq!(r.start(), "9q8");
        assert_eq!(r.end(), "9q9");
    }

    #[test]
    fn test_for_bits_inside_symbol() {
        // 12 bits: two full symbols plus 2 significant bits of 'y' (30).
        // 30 >> 3 << 3 = 24 ('s'), end 24 + 8 = 32 overflows.
        let r = GeoHashRange::for_bits(&hash("9q8yyk8ytp"), 12);
        assert_eq!(r.start(), "9qs");
        assert_eq!(r.end(), "9q~");

        // 13 bits of "9q8": '8' (8) keeps 3 bits -> 8, end 8 + 4 = 12 ('d').
        let r = GeoHashRange::for_bits(&hash("9q8yyk8ytp"), 13);
        assert_eq!(r.start(), "9q8");
        assert_eq!(r.end(), "9qd");
    }

    #[test]
    fn test_for_bits_short_hash_is_open() {
        let r = GeoHashRange::for_bits(&hash("9q"), 20);
        assert_eq!(r, GeoHashRange::prefixed(&hash("9q")));
        assert_eq!(r.end(), "9q~");
    }

    #[test]
    fn test_for_bits_covers_source_hash() {
        let source = hash("dr5regw3pp");
        for bits in 1..=50 {
            let r = GeoHashRange::for_bits(&source, bits);
            assert!(r.contains(source.as_str()), "bits={bits} range={r}");
        }
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = range("9q8", "9q9");
        assert!(r.contains("9q8"));
        assert!(r.contains("9q8yyk8ytp"));
        assert!(r.contains("9q9"));
        assert!(!r.contains("9q9b"));
        assert!(!r.contains("9q7zzz"));
    }

    #[test]
    fn test_merge_containment() {
        let wide = range("9q8", "9qd");
        let narrow = range("9q9", "9qb");
        assert!(wide.can_merge_with(&narrow));
        assert_eq!(merge_ranges([narrow, wide.clone()]), vec![wide]);
    }

    #[test]
    fn test_merge_adjacent() {
        let merged = merge_ranges([range("9q9", "9qb"), range("9q8", "9q9")]);
        assert_eq!(merged, vec![range("9q8", "9qb")]);
    }

    #[test]
    fn test_merge_chain() {
        let merged = merge_ranges([
            range("9q8", "9q9"),
            range("9qc", "9qd"),
            range("9q9", "9qb"),
            range("9qb", "9qc"),
        ]);
        assert_eq!(merged, vec![range("9q8", "9qd")]);
    }

    #[test]
    fn test_disjoint_ranges_stay_apart() {
        let merged = merge_ranges([range("dr5", "dr6"), range("9q8", "9q9"), range("9q8", "9q9")]);
        assert_eq!(merged, vec![range("9q8", "9q9"), range("dr5", "dr6")]);
        assert!(!merged[0].can_merge_with(&merged[1]));
    }

    #[test]
    fn test_merge_with_open_end() {
        let open = GeoHashRange::prefixed(&hash("9q"));
        let inner = range("9qs", "9qz");
        assert_eq!(merge_ranges([inner, open.clone()]), vec![open]);
    }
}
