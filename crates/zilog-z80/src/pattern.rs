//! Opcode bit patterns.
//!
//! A pattern is written one character per bit, most significant bit of the
//! first byte first. `0` and `1` are fixed bits; a lowercase letter is one bit
//! of the field named by that letter. A field's bits need not be contiguous
//! and may span bytes, so `00pp0001 nnnnnnnn nnnnnnnn` (spaces for
//! readability only) is `LD rp,nn` with a 2-bit field `p` and a 16-bit
//! immediate `n`.
//!
//! The stream stores immediates little-endian while the bit walk collects
//! them in stream order, so fields wider than a byte are byte-swapped after
//! collection.

use crate::error::CatalogError;
use crate::fetcher::CodeFetcher;
use crate::functions::Function;

/// Longest instruction, in bytes.
pub const MAX_BYTES: usize = 4;

/// One argument slot per field letter.
pub const FIELD_COUNT: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bit {
    Zero,
    One,
    Field(u8),
}

/// A compiled opcode pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bits: Vec<Bit>,
    widths: [u8; FIELD_COUNT],
    /// Index of each field's last bit.
    last_bit: [usize; FIELD_COUNT],
}

impl Pattern {
    /// Compile a pattern string. Spaces are ignored.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut bits = Vec::with_capacity(MAX_BYTES * 8);
        let mut widths = [0u8; FIELD_COUNT];
        let mut last_bit = [0usize; FIELD_COUNT];

        for c in text.chars().filter(|c| *c != ' ') {
            let bit = match c {
                '0' => Bit::Zero,
                '1' => Bit::One,
                'a'..='z' => {
                    let field = c as u8 - b'a';
                    widths[usize::from(field)] += 1;
                    last_bit[usize::from(field)] = bits.len();
                    Bit::Field(field)
                }
                found => {
                    return Err(CatalogError::BadPatternChar {
                        pattern: text.to_string(),
                        found,
                    });
                }
            };
            bits.push(bit);
        }

        if bits.is_empty() || bits.len() % 8 != 0 {
            return Err(CatalogError::PartialByte {
                pattern: text.to_string(),
                bits: bits.len(),
            });
        }
        if bits.len() > MAX_BYTES * 8 {
            return Err(CatalogError::TooLong {
                pattern: text.to_string(),
            });
        }

        Ok(Self {
            bits,
            widths,
            last_bit,
        })
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len() / 8
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Width in bits of the field named `letter`, 0 if absent.
    #[must_use]
    pub fn field_width(&self, letter: char) -> u8 {
        field_index(letter).map_or(0, |i| self.widths[i])
    }

    /// Field indices present in the pattern, with their widths.
    pub fn fields(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.widths
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0)
            .map(|(i, w)| (i as u8, *w))
    }

    /// Whether `prefix` could be the start of an instruction with this
    /// pattern.
    ///
    /// Fixed bits must agree. Once all bits of a field are known its value
    /// must be accepted by every function the mnemonic passes it to. A
    /// prefix shorter than the pattern matches if nothing disagrees so far;
    /// bytes beyond the pattern are ignored.
    #[must_use]
    pub fn might_match(&self, prefix: &[u8], constraints: &[(u8, Function)]) -> bool {
        let available = prefix.len() * 8;
        let mut acc = [0u32; FIELD_COUNT];

        for (i, bit) in self.bits.iter().enumerate() {
            if i >= available {
                return true;
            }
            let concrete = u32::from((prefix[i / 8] >> (7 - i % 8)) & 1);
            match *bit {
                Bit::Zero if concrete != 0 => return false,
                Bit::One if concrete != 1 => return false,
                Bit::Zero | Bit::One => {}
                Bit::Field(f) => {
                    let f = usize::from(f);
                    acc[f] = (acc[f] << 1) | concrete;
                    if self.last_bit[f] == i {
                        let value = normalize(self.widths[f], acc[f]);
                        let rejected = constraints
                            .iter()
                            .any(|&(field, func)| usize::from(field) == f && !func.accepts(value));
                        if rejected {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    /// Walk the pattern against the fetcher, filling `args` with field
    /// values. The fetcher is restarted first.
    ///
    /// Returns false if a fixed bit disagrees with the fetched bytes.
    pub fn extract<F: CodeFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
        args: &mut [u32; FIELD_COUNT],
    ) -> bool {
        fetcher.restart();
        *args = [0; FIELD_COUNT];
        let mut matched = true;

        for byte_bits in self.bits.chunks(8) {
            let byte = fetcher.fetch_next_byte();
            for (j, bit) in byte_bits.iter().enumerate() {
                let concrete = u32::from((byte >> (7 - j)) & 1);
                match *bit {
                    Bit::Zero => matched &= concrete == 0,
                    Bit::One => matched &= concrete == 1,
                    Bit::Field(f) => {
                        let slot = &mut args[usize::from(f)];
                        *slot = (*slot << 1) | concrete;
                    }
                }
            }
        }

        for (f, width) in self.widths.iter().enumerate() {
            if *width > 8 {
                args[f] = normalize(*width, args[f]);
            }
        }
        matched
    }

    /// Build the instruction bytes for the given field values. The inverse
    /// of [`extract`](Self::extract).
    #[must_use]
    pub fn encode(&self, args: &[u32; FIELD_COUNT]) -> Vec<u8> {
        let mut raw = [0u32; FIELD_COUNT];
        for (f, width) in self.widths.iter().enumerate() {
            raw[f] = normalize(*width, args[f]);
        }
        let mut remaining = self.widths;

        let mut out = vec![0u8; self.len()];
        for (i, bit) in self.bits.iter().enumerate() {
            let value = match *bit {
                Bit::Zero => 0,
                Bit::One => 1,
                Bit::Field(f) => {
                    let f = usize::from(f);
                    remaining[f] -= 1;
                    (raw[f] >> remaining[f]) & 1
                }
            };
            out[i / 8] |= (value as u8) << (7 - i % 8);
        }
        out
    }
}

/// Index of a field letter.
#[must_use]
pub fn field_index(letter: char) -> Option<usize> {
    letter
        .is_ascii_lowercase()
        .then(|| usize::from(letter as u8 - b'a'))
}

/// Reverse the byte order of a field wider than one byte. A field spans
/// `ceil(width / 8)` bytes; narrower fields are returned unchanged. The swap
/// is its own inverse.
///
/// A 17- to 24-bit field reverses three bytes, not four: the swap follows
/// the bytes the field actually occupies, so that [`Pattern::encode`] and
/// extraction agree.
#[must_use]
pub fn normalize(width: u8, value: u32) -> u32 {
    let bytes = usize::from(width.div_ceil(8));
    if bytes <= 1 {
        return value;
    }
    let be = value.to_be_bytes();
    be[4 - bytes.min(4)..]
        .iter()
        .rev()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::SliceFetcher;

    fn args(pairs: &[(char, u32)]) -> [u32; FIELD_COUNT] {
        let mut out = [0; FIELD_COUNT];
        for &(letter, value) in pairs {
            out[field_index(letter).unwrap()] = value;
        }
        out
    }

    #[test]
    fn parse_counts_fields() {
        let p = Pattern::parse("00pp0001 nnnnnnnn nnnnnnnn").unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.field_width('p'), 2);
        assert_eq!(p.field_width('n'), 16);
        assert_eq!(p.field_width('q'), 0);
        assert_eq!(p.fields().count(), 2);
    }

    #[test]
    fn parse_rejects_partial_bytes_and_bad_chars() {
        assert!(matches!(
            Pattern::parse("0000000"),
            Err(CatalogError::PartialByte { bits: 7, .. })
        ));
        assert!(matches!(
            Pattern::parse("0000000X"),
            Err(CatalogError::BadPatternChar { found: 'X', .. })
        ));
        assert!(matches!(
            Pattern::parse(&"0".repeat(40)),
            Err(CatalogError::TooLong { .. })
        ));
    }

    #[test]
    fn might_match_checks_fixed_bits() {
        let p = Pattern::parse("11x11101 00100001 nnnnnnnn nnnnnnnn").unwrap();
        assert!(p.might_match(&[0xDD], &[]));
        assert!(p.might_match(&[0xFD, 0x21], &[]));
        assert!(!p.might_match(&[0xED], &[]));
        assert!(!p.might_match(&[0xDD, 0x22], &[]));
        assert!(p.might_match(&[0xDD, 0x21, 0x00, 0x00, 0x99], &[]));
    }

    #[test]
    fn might_match_prunes_rejected_field_values() {
        let p = Pattern::parse("01rrr110").unwrap();
        let r = [(17u8, Function::by_name("R").unwrap())];
        assert!(p.might_match(&[0x7E], &r));
        // r = 6 is (HL), a hole in the register enumeration.
        assert!(!p.might_match(&[0x76], &r));
    }

    #[test]
    fn extract_swaps_wide_fields() {
        let p = Pattern::parse("00pp0001 nnnnnnnn nnnnnnnn").unwrap();
        let mut fetcher = SliceFetcher::new([0x21, 0x34, 0x12]);
        let mut out = [0; FIELD_COUNT];
        assert!(p.extract(&mut fetcher, &mut out));
        assert_eq!(out[field_index('p').unwrap()], 2);
        assert_eq!(out[field_index('n').unwrap()], 0x1234);
    }

    #[test]
    fn extract_reports_mismatch() {
        let p = Pattern::parse("00000000").unwrap();
        let mut fetcher = SliceFetcher::new([0x01]);
        let mut out = [0; FIELD_COUNT];
        assert!(!p.extract(&mut fetcher, &mut out));
    }

    #[test]
    fn encode_places_split_fields() {
        let p = Pattern::parse("11x11101 11001011 dddddddd 01bbb110").unwrap();
        let bytes = p.encode(&args(&[('x', 1), ('d', 0xFE), ('b', 5)]));
        assert_eq!(bytes, vec![0xFD, 0xCB, 0xFE, 0x6E]);
    }

    #[test]
    fn normalize_swaps_within_field_width() {
        assert_eq!(normalize(8, 0x12), 0x12);
        assert_eq!(normalize(16, 0x3412), 0x1234);
        assert_eq!(normalize(24, 0x56_3412), 0x12_3456);
        assert_eq!(normalize(32, 0x7856_3412), 0x1234_5678);
    }

    #[test]
    fn wide_field_round_trip() {
        let p = Pattern::parse("10101010 nnnnnnnn nnnnnnnn nnnnnnnn").unwrap();
        let bytes = p.encode(&args(&[('n', 0x00AB_CDEF)]));
        assert_eq!(bytes, vec![0xAA, 0xEF, 0xCD, 0xAB]);
        let mut fetcher = SliceFetcher::new(bytes);
        let mut out = [0; FIELD_COUNT];
        assert!(p.extract(&mut fetcher, &mut out));
        assert_eq!(out[field_index('n').unwrap()], 0x00AB_CDEF);
    }
}
