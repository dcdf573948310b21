//! Arithmetic and logic primitives.
//!
//! Every function returns the raw result together with the flags it defines.
//! Callers merge those into F, keeping whatever flags the instruction leaves
//! unmodified (for example INC/DEC keep C, 16-bit ADD keeps S, Z and P/V).

use crate::flags::{sz53, sz53p, CF, HF, NF, PF, SF, XF, YF, ZF};

/// Result of an 8-bit ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// The eight accumulator operations, in opcode-field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    /// Operation selected by a 3-bit opcode field.
    #[must_use]
    pub const fn from_field(field: u32) -> Self {
        match field & 7 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbc,
            4 => Self::And,
            5 => Self::Xor,
            6 => Self::Or,
            _ => Self::Cp,
        }
    }

    /// CP only sets flags; every other operation writes A.
    #[must_use]
    pub const fn writes_result(self) -> bool {
        !matches!(self, Self::Cp)
    }
}

/// The eight CB-prefix rotate/shift operations, in opcode-field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Sll,
    Srl,
}

impl ShiftOp {
    /// Operation selected by a 3-bit opcode field.
    #[must_use]
    pub const fn from_field(field: u32) -> Self {
        match field & 7 {
            0 => Self::Rlc,
            1 => Self::Rrc,
            2 => Self::Rl,
            3 => Self::Rr,
            4 => Self::Sla,
            5 => Self::Sra,
            6 => Self::Sll,
            _ => Self::Srl,
        }
    }
}

/// Apply an accumulator operation. `carry` is the incoming C flag; only ADC
/// and SBC read it.
#[must_use]
pub fn alu8(op: AluOp, a: u8, b: u8, carry: bool) -> AluResult {
    match op {
        AluOp::Add => add8(a, b, false),
        AluOp::Adc => add8(a, b, carry),
        AluOp::Sub => sub8(a, b, false),
        AluOp::Sbc => sub8(a, b, carry),
        AluOp::And => logic(a & b, HF),
        AluOp::Xor => logic(a ^ b, 0),
        AluOp::Or => logic(a | b, 0),
        AluOp::Cp => cp8(a, b),
    }
}

fn logic(value: u8, extra: u8) -> AluResult {
    AluResult {
        value,
        flags: sz53p(value) | extra,
    }
}

/// Add two bytes with optional carry.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let value = wide as u8;

    let mut flags = sz53(value);
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= HF;
    }
    // Operands of equal sign yielding a result of the other sign.
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }

    AluResult { value, flags }
}

/// Subtract two bytes with optional borrow.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);

    let mut flags = sz53(value) | NF;
    if (a & 0x0F) < (b & 0x0F) + c {
        flags |= HF;
    }
    // Operands of different sign, result with the sign of the subtrahend.
    if (a ^ b) & 0x80 != 0 && (b ^ value) & 0x80 == 0 {
        flags |= PF;
    }
    if u16::from(a) < u16::from(b) + u16::from(c) {
        flags |= CF;
    }

    AluResult { value, flags }
}

/// Compare: subtract for flags only. Bits 5/3 come from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> AluResult {
    let diff = sub8(a, b, false);
    AluResult {
        value: a,
        flags: (diff.flags & !(YF | XF)) | (b & (YF | XF)),
    }
}

/// Increment. Carry is not defined here; callers keep the old C.
#[must_use]
pub fn inc8(a: u8) -> AluResult {
    let value = a.wrapping_add(1);
    let mut flags = sz53(value);
    if a & 0x0F == 0x0F {
        flags |= HF;
    }
    if a == 0x7F {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// Decrement. Carry is not defined here; callers keep the old C.
#[must_use]
pub fn dec8(a: u8) -> AluResult {
    let value = a.wrapping_sub(1);
    let mut flags = sz53(value) | NF;
    if a & 0x0F == 0x00 {
        flags |= HF;
    }
    if a == 0x80 {
        flags |= PF;
    }
    AluResult { value, flags }
}

/// CB-prefix rotate or shift. Defines every flag.
#[must_use]
pub fn shift8(op: ShiftOp, a: u8, carry: bool) -> AluResult {
    let (value, out) = match op {
        ShiftOp::Rlc => (a.rotate_left(1), a & 0x80 != 0),
        ShiftOp::Rrc => (a.rotate_right(1), a & 0x01 != 0),
        ShiftOp::Rl => ((a << 1) | u8::from(carry), a & 0x80 != 0),
        ShiftOp::Rr => ((a >> 1) | (u8::from(carry) << 7), a & 0x01 != 0),
        ShiftOp::Sla => (a << 1, a & 0x80 != 0),
        ShiftOp::Sra => ((a >> 1) | (a & 0x80), a & 0x01 != 0),
        ShiftOp::Sll => ((a << 1) | 1, a & 0x80 != 0),
        ShiftOp::Srl => (a >> 1, a & 0x01 != 0),
    };
    AluResult {
        value,
        flags: sz53p(value) | if out { CF } else { 0 },
    }
}

/// Accumulator rotate (RLCA, RRCA, RLA, RRA). S, Z and P/V are left as they
/// were, so the result carries only H=0, N=0, bits 5/3 and C. `select` is the
/// two-bit opcode field.
#[must_use]
pub fn rotate_a(select: u32, a: u8, f: u8) -> AluResult {
    let carry = f & CF != 0;
    let shifted = match select & 3 {
        0 => shift8(ShiftOp::Rlc, a, carry),
        1 => shift8(ShiftOp::Rrc, a, carry),
        2 => shift8(ShiftOp::Rl, a, carry),
        _ => shift8(ShiftOp::Rr, a, carry),
    };
    AluResult {
        value: shifted.value,
        flags: (f & (SF | ZF | PF)) | (shifted.value & (YF | XF)) | (shifted.flags & CF),
    }
}

/// Decimal adjust A after a BCD add or subtract.
#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let subtract = f & NF != 0;
    let half = f & HF != 0;
    let mut carry = f & CF != 0;

    let mut correction = 0u8;
    if half || a & 0x0F > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }

    let value = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half_out = if subtract {
        half && a & 0x0F < 6
    } else {
        a & 0x0F > 9
    };

    let mut flags = sz53p(value) | (f & NF);
    if half_out {
        flags |= HF;
    }
    if carry {
        flags |= CF;
    }
    AluResult { value, flags }
}

/// BIT n test. Returns the flags with C taken from `f`. `hidden` supplies
/// bits 5/3 (the operand for registers, the address high byte for memory).
#[must_use]
pub fn bit(n: u32, value: u8, hidden: u8, f: u8) -> u8 {
    let set = value & (1 << (n & 7)) != 0;
    let mut flags = (f & CF) | HF | (hidden & (YF | XF));
    if !set {
        flags |= ZF | PF;
    }
    if set && n & 7 == 7 {
        flags |= SF;
    }
    flags
}

/// 16-bit add for HL/IX/IY. Only H, N, C and bits 5/3 are defined.
#[must_use]
pub fn add16(a: u16, b: u16) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;

    let mut flags = ((value >> 8) as u8) & (YF | XF);
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        flags |= HF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}

/// 16-bit add with carry for HL. Defines every flag.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let wide = u32::from(a) + u32::from(b) + u32::from(c);
    let value = wide as u16;

    let mut flags = ((value >> 8) as u8) & (SF | YF | XF);
    if value == 0 {
        flags |= ZF;
    }
    if (a & 0x0FFF) + (b & 0x0FFF) + c > 0x0FFF {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        flags |= PF;
    }
    if wide > 0xFFFF {
        flags |= CF;
    }
    (value, flags)
}

/// 16-bit subtract with borrow for HL. Defines every flag.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> (u16, u8) {
    let c = u16::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);

    let mut flags = NF | (((value >> 8) as u8) & (SF | YF | XF));
    if value == 0 {
        flags |= ZF;
    }
    if (a & 0x0FFF) < (b & 0x0FFF) + c {
        flags |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (b ^ value) & 0x8000 == 0 {
        flags |= PF;
    }
    if u32::from(a) < u32::from(b) + u32::from(c) {
        flags |= CF;
    }
    (value, flags)
}
