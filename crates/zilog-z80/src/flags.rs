//! Z80 flag register bits and precomputed flag tables.

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5) - copy of bit 5 of result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3) - copy of bit 3 of result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

const fn build_sz53(with_parity: bool) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let value = i as u8;
        let mut f = value & (SF | YF | XF);
        if value == 0 {
            f |= ZF;
        }
        if with_parity && value.count_ones() % 2 == 0 {
            f |= PF;
        }
        table[i] = f;
        i += 1;
    }
    table
}

/// Sign, zero and bits 5/3 of a result byte.
pub static SZ53: [u8; 256] = build_sz53(false);

/// [`SZ53`] plus even parity in P/V.
pub static SZ53P: [u8; 256] = build_sz53(true);

/// Even parity of a byte, from the precomputed table.
#[must_use]
pub fn parity(value: u8) -> bool {
    SZ53P[usize::from(value)] & PF != 0
}

/// Flags byte for a result: sign, zero, bits 5/3.
#[must_use]
pub fn sz53(value: u8) -> u8 {
    SZ53[usize::from(value)]
}

/// Flags byte for a result: sign, zero, bits 5/3 and parity.
#[must_use]
pub fn sz53p(value: u8) -> u8 {
    SZ53P[usize::from(value)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_table_matches_popcount() {
        for v in 0..=255u8 {
            assert_eq!(parity(v), v.count_ones() % 2 == 0, "parity of {v:02X}");
        }
    }

    #[test]
    fn zero_and_sign() {
        assert_eq!(sz53(0x00), ZF);
        assert_eq!(sz53p(0x00), ZF | PF);
        assert_eq!(sz53(0x80), SF);
        assert_eq!(sz53p(0x28), YF | XF | PF);
    }
}
