//! Exhaustive flag checks for the 8-bit ALU against a straightforward
//! signed/unsigned reference model.

use zilog_z80::alu::{self, AluOp};
use zilog_z80::{CF, HF, NF, PF, SF, XF, YF, ZF};

const OPS: [AluOp; 8] = [
    AluOp::Add,
    AluOp::Adc,
    AluOp::Sub,
    AluOp::Sbc,
    AluOp::And,
    AluOp::Xor,
    AluOp::Or,
    AluOp::Cp,
];

fn bit(condition: bool, flag: u8) -> u8 {
    if condition { flag } else { 0 }
}

/// Expected (A, F) after `op`. Sign, zero and bits 5/3 come from the result
/// except for CP, which copies bits 5/3 from the operand.
fn reference(op: AluOp, a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let c = i32::from(carry_in);
    let (ua, ub) = (i32::from(a), i32::from(b));
    let (sa, sb) = (i32::from(a as i8), i32::from(b as i8));

    let (result, h, v, carry, n) = match op {
        AluOp::Add | AluOp::Adc => {
            let c = if op == AluOp::Add { 0 } else { c };
            let sum = ua + ub + c;
            let signed = sa + sb + c;
            (
                sum as u8,
                (ua & 0xF) + (ub & 0xF) + c > 0xF,
                !(-128..=127).contains(&signed),
                sum > 0xFF,
                false,
            )
        }
        AluOp::Sub | AluOp::Sbc | AluOp::Cp => {
            let c = if op == AluOp::Sbc { c } else { 0 };
            let diff = ua - ub - c;
            let signed = sa - sb - c;
            (
                diff as u8,
                (ua & 0xF) - (ub & 0xF) - c < 0,
                !(-128..=127).contains(&signed),
                diff < 0,
                true,
            )
        }
        AluOp::And | AluOp::Xor | AluOp::Or => {
            let r = match op {
                AluOp::And => a & b,
                AluOp::Xor => a ^ b,
                _ => a | b,
            };
            (r, op == AluOp::And, r.count_ones() % 2 == 0, false, false)
        }
    };

    let undocumented = (if op == AluOp::Cp { b } else { result }) & (YF | XF);
    let flags = (result & SF)
        | bit(result == 0, ZF)
        | undocumented
        | bit(h, HF)
        | bit(v, PF)
        | bit(n, NF)
        | bit(carry, CF);
    let value = if op == AluOp::Cp { a } else { result };
    (value, flags)
}

#[test]
fn alu8_matches_reference_for_every_operand_pair() {
    for op in OPS {
        for carry in [false, true] {
            for a in 0..=255u8 {
                for b in 0..=255u8 {
                    let got = alu::alu8(op, a, b, carry);
                    let (value, flags) = reference(op, a, b, carry);
                    assert_eq!(
                        (got.value, got.flags),
                        (value, flags),
                        "{op:?} {a:02X},{b:02X} carry={carry}: got F={:08b}, want F={flags:08b}",
                        got.flags
                    );
                }
            }
        }
    }
}

#[test]
fn inc_and_dec_every_value() {
    for a in 0..=255u8 {
        let inc = alu::inc8(a);
        let r = a.wrapping_add(1);
        let want = (r & (SF | YF | XF))
            | bit(r == 0, ZF)
            | bit(a & 0xF == 0xF, HF)
            | bit(a == 0x7F, PF);
        assert_eq!((inc.value, inc.flags), (r, want), "INC {a:02X}");

        let dec = alu::dec8(a);
        let r = a.wrapping_sub(1);
        let want = (r & (SF | YF | XF))
            | bit(r == 0, ZF)
            | bit(a & 0xF == 0, HF)
            | bit(a == 0x80, PF)
            | NF;
        assert_eq!((dec.value, dec.flags), (r, want), "DEC {a:02X}");
    }
}

fn to_bcd(n: u32) -> u8 {
    (((n / 10) << 4) | (n % 10)) as u8
}

#[test]
fn daa_corrects_bcd_addition_and_subtraction() {
    for x in 0..100u32 {
        for y in 0..100u32 {
            let (a, b) = (to_bcd(x), to_bcd(y));

            let sum = alu::add8(a, b, false);
            let adjusted = alu::daa(sum.value, sum.flags);
            assert_eq!(adjusted.value, to_bcd((x + y) % 100), "{x} + {y}");
            assert_eq!(adjusted.flags & CF != 0, x + y >= 100, "{x} + {y} carry");

            let diff = alu::sub8(a, b, false);
            let adjusted = alu::daa(diff.value, diff.flags);
            assert_eq!(adjusted.value, to_bcd((x + 100 - y) % 100), "{x} - {y}");
            assert_eq!(adjusted.flags & CF != 0, x < y, "{x} - {y} borrow");
            assert_ne!(adjusted.flags & NF, 0);
        }
    }
}

#[test]
fn sixteen_bit_arithmetic() {
    let (value, flags) = alu::add16(0x0FFF, 0x0001);
    assert_eq!(value, 0x1000);
    assert_eq!(flags, HF);

    let (value, flags) = alu::add16(0xFFFF, 0x0001);
    assert_eq!(value, 0);
    assert_eq!(flags, HF | CF);

    let (value, flags) = alu::adc16(0x7FFF, 0x0000, true);
    assert_eq!(value, 0x8000);
    assert_eq!(flags, SF | HF | PF);

    let (value, flags) = alu::sbc16(0x0000, 0x0000, true);
    assert_eq!(value, 0xFFFF);
    assert_eq!(flags, SF | YF | HF | XF | NF | CF);
}
