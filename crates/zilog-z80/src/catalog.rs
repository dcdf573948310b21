//! The instruction catalog.
//!
//! Every documented Z80 instruction form is one [`GenericOperation`]: a
//! mnemonic template, a bit pattern (see [`crate::pattern`]), its clock cost
//! and the effect to apply. IX and IY forms share a template through the
//! one-bit prefix field `x` (`11x11101` is DD or FD).
//!
//! Field letters used throughout: `r`/`s` 8-bit register, `p` register pair,
//! `q` stack pair, `c` condition, `o` operation select, `n` immediate, `d`
//! index displacement, `e` relative jump offset, `x` index register, `b` bit
//! number, `m` interrupt mode, `i` block direction.

/// How an instruction reaches its memory operand or 16-bit register:
/// through HL, or through IX/IY (plus the displacement `d` for memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Hl,
    Index,
}

/// The effect of an instruction. Executed by one `match` in the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Nop,
    Halt,
    Di,
    Ei,
    Im,

    // 8-bit loads
    LdRR,
    LdRImm,
    LdRMem(Base),
    LdMemR(Base),
    LdMemImm(Base),
    LdAPair,
    LdPairA,
    LdAAbs,
    LdAbsA,
    LdAI,
    LdAR,
    LdIA,
    LdRA,

    // 16-bit loads
    LdRpImm,
    LdIndexImm,
    LoadWide(Base),
    StoreWide(Base),
    LoadRp,
    StoreRp,
    LdSpWide(Base),
    Push,
    Pop,
    PushIndex,
    PopIndex,

    // Exchanges
    ExAf,
    Exx,
    ExDeHl,
    ExSp(Base),

    // 8-bit arithmetic
    AluR,
    AluImm,
    AluMem(Base),
    IncR,
    DecR,
    IncMem(Base),
    DecMem(Base),
    Daa,
    Cpl,
    Neg,
    Scf,
    Ccf,

    // 16-bit arithmetic
    IncRp,
    DecRp,
    IncIndex,
    DecIndex,
    AddHl,
    AddIndex,
    AddIndexSelf,
    AdcHl,
    SbcHl,

    // Rotates, shifts and bit operations
    RotateA,
    ShiftR,
    ShiftMem(Base),
    BitR,
    BitMem(Base),
    ResR,
    ResMem(Base),
    SetR,
    SetMem(Base),
    Rrd,
    Rld,

    // Control flow
    Jp,
    JpCond,
    JpWide(Base),
    Jr,
    JrCond,
    Djnz,
    Call,
    CallCond,
    Ret,
    RetCond,
    Reti,
    Retn,
    Rst,

    // Input and output
    InAImm,
    OutImmA,
    InRC,
    OutCR,

    // Block transfer, compare and I/O
    BlockLoad { repeat: bool },
    BlockCompare { repeat: bool },
    BlockIn { repeat: bool },
    BlockOut { repeat: bool },
}

/// One instruction form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericOperation {
    pub mnemonic: &'static str,
    pub pattern: &'static str,
    /// Clock periods (T-states) when the instruction takes its normal path.
    pub cycles: u32,
    /// Clock periods when a conditional branch is not taken or a repeating
    /// block instruction finishes.
    pub alt_cycles: u32,
    pub kind: OpKind,
}

impl GenericOperation {
    /// An instruction with a single cost.
    #[must_use]
    pub const fn new(
        mnemonic: &'static str,
        pattern: &'static str,
        cycles: u32,
        kind: OpKind,
    ) -> Self {
        Self {
            mnemonic,
            pattern,
            cycles,
            alt_cycles: cycles,
            kind,
        }
    }

    /// An instruction whose cost depends on the path taken.
    #[must_use]
    pub const fn conditional(
        mnemonic: &'static str,
        pattern: &'static str,
        cycles: u32,
        alt_cycles: u32,
        kind: OpKind,
    ) -> Self {
        Self {
            mnemonic,
            pattern,
            cycles,
            alt_cycles,
            kind,
        }
    }
}

use Base::{Hl, Index};
use GenericOperation as G;
use OpKind as K;

/// Every documented Z80 instruction.
pub static CATALOG: &[GenericOperation] = &[
    // Unprefixed
    G::new("NOP", "00000000", 4, K::Nop),
    G::new(r"LD \RP[p],\NN[n]", "00pp0001 nnnnnnnn nnnnnnnn", 10, K::LdRpImm),
    G::new(r"LD (\BD[p]),A", "000p0010", 7, K::LdPairA),
    G::new(r"LD A,(\BD[p])", "000p1010", 7, K::LdAPair),
    G::new(r"INC \RP[p]", "00pp0011", 6, K::IncRp),
    G::new(r"DEC \RP[p]", "00pp1011", 6, K::DecRp),
    G::new(r"INC \R[r]", "00rrr100", 4, K::IncR),
    G::new(r"DEC \R[r]", "00rrr101", 4, K::DecR),
    G::new("INC (HL)", "00110100", 11, K::IncMem(Hl)),
    G::new("DEC (HL)", "00110101", 11, K::DecMem(Hl)),
    G::new(r"LD \R[r],\N[n]", "00rrr110 nnnnnnnn", 7, K::LdRImm),
    G::new(r"LD (HL),\N[n]", "00110110 nnnnnnnn", 10, K::LdMemImm(Hl)),
    G::new(r"\ACC[o]", "000oo111", 4, K::RotateA),
    G::new("DAA", "00100111", 4, K::Daa),
    G::new("CPL", "00101111", 4, K::Cpl),
    G::new("SCF", "00110111", 4, K::Scf),
    G::new("CCF", "00111111", 4, K::Ccf),
    G::new("EX AF,AF'", "00001000", 4, K::ExAf),
    G::new(r"ADD HL,\RP[p]", "00pp1001", 11, K::AddHl),
    G::conditional(r"DJNZ \REL[e]", "00010000 eeeeeeee", 13, 8, K::Djnz),
    G::new(r"JR \REL[e]", "00011000 eeeeeeee", 12, K::Jr),
    G::conditional(r"JR \CJ[c],\REL[e]", "001cc000 eeeeeeee", 12, 7, K::JrCond),
    G::new(r"LD (\NN[n]),HL", "00100010 nnnnnnnn nnnnnnnn", 16, K::StoreWide(Hl)),
    G::new(r"LD HL,(\NN[n])", "00101010 nnnnnnnn nnnnnnnn", 16, K::LoadWide(Hl)),
    G::new(r"LD (\NN[n]),A", "00110010 nnnnnnnn nnnnnnnn", 13, K::LdAbsA),
    G::new(r"LD A,(\NN[n])", "00111010 nnnnnnnn nnnnnnnn", 13, K::LdAAbs),
    G::new(r"LD \R[r],\R[s]", "01rrrsss", 4, K::LdRR),
    G::new(r"LD \R[r],(HL)", "01rrr110", 7, K::LdRMem(Hl)),
    G::new(r"LD (HL),\R[s]", "01110sss", 7, K::LdMemR(Hl)),
    G::new("HALT", "01110110", 4, K::Halt),
    G::new(r"\ALU[o]\R[s]", "10ooosss", 4, K::AluR),
    G::new(r"\ALU[o](HL)", "10ooo110", 7, K::AluMem(Hl)),
    G::new(r"\ALU[o]\N[n]", "11ooo110 nnnnnnnn", 7, K::AluImm),
    G::conditional(r"RET \CC[c]", "11ccc000", 11, 5, K::RetCond),
    G::new("RET", "11001001", 10, K::Ret),
    G::new(r"POP \RQ[q]", "11qq0001", 10, K::Pop),
    G::new(r"PUSH \RQ[q]", "11qq0101", 11, K::Push),
    G::conditional(r"JP \CC[c],\NN[n]", "11ccc010 nnnnnnnn nnnnnnnn", 10, 10, K::JpCond),
    G::new(r"JP \NN[n]", "11000011 nnnnnnnn nnnnnnnn", 10, K::Jp),
    G::conditional(r"CALL \CC[c],\NN[n]", "11ccc100 nnnnnnnn nnnnnnnn", 17, 10, K::CallCond),
    G::new(r"CALL \NN[n]", "11001101 nnnnnnnn nnnnnnnn", 17, K::Call),
    G::new(r"RST \RST[p]", "11ppp111", 11, K::Rst),
    G::new(r"OUT (\N[n]),A", "11010011 nnnnnnnn", 11, K::OutImmA),
    G::new(r"IN A,(\N[n])", "11011011 nnnnnnnn", 11, K::InAImm),
    G::new("EXX", "11011001", 4, K::Exx),
    G::new("EX (SP),HL", "11100011", 19, K::ExSp(Hl)),
    G::new("JP (HL)", "11101001", 4, K::JpWide(Hl)),
    G::new("EX DE,HL", "11101011", 4, K::ExDeHl),
    G::new("LD SP,HL", "11111001", 6, K::LdSpWide(Hl)),
    G::new("DI", "11110011", 4, K::Di),
    G::new("EI", "11111011", 4, K::Ei),
    // CB: rotates, shifts and bit operations
    G::new(r"\ROT[o] \R[r]", "11001011 00ooorrr", 8, K::ShiftR),
    G::new(r"\ROT[o] (HL)", "11001011 00ooo110", 15, K::ShiftMem(Hl)),
    G::new(r"BIT \BIT[b],\R[r]", "11001011 01bbbrrr", 8, K::BitR),
    G::new(r"BIT \BIT[b],(HL)", "11001011 01bbb110", 12, K::BitMem(Hl)),
    G::new(r"RES \BIT[b],\R[r]", "11001011 10bbbrrr", 8, K::ResR),
    G::new(r"RES \BIT[b],(HL)", "11001011 10bbb110", 15, K::ResMem(Hl)),
    G::new(r"SET \BIT[b],\R[r]", "11001011 11bbbrrr", 8, K::SetR),
    G::new(r"SET \BIT[b],(HL)", "11001011 11bbb110", 15, K::SetMem(Hl)),
    // DD / FD: index registers
    G::new(r"ADD \IDX[x],\RX[p]", "11x11101 00pp1001", 15, K::AddIndex),
    G::new(r"ADD \IDX[x],\IDX[x]", "11x11101 00101001", 15, K::AddIndexSelf),
    G::new(r"LD \IDX[x],\NN[n]", "11x11101 00100001 nnnnnnnn nnnnnnnn", 14, K::LdIndexImm),
    G::new(r"LD (\NN[n]),\IDX[x]", "11x11101 00100010 nnnnnnnn nnnnnnnn", 20, K::StoreWide(Index)),
    G::new(r"LD \IDX[x],(\NN[n])", "11x11101 00101010 nnnnnnnn nnnnnnnn", 20, K::LoadWide(Index)),
    G::new(r"INC \IDX[x]", "11x11101 00100011", 10, K::IncIndex),
    G::new(r"DEC \IDX[x]", "11x11101 00101011", 10, K::DecIndex),
    G::new(r"INC (\IDX[x]\D[d])", "11x11101 00110100 dddddddd", 23, K::IncMem(Index)),
    G::new(r"DEC (\IDX[x]\D[d])", "11x11101 00110101 dddddddd", 23, K::DecMem(Index)),
    G::new(
        r"LD (\IDX[x]\D[d]),\N[n]",
        "11x11101 00110110 dddddddd nnnnnnnn",
        19,
        K::LdMemImm(Index),
    ),
    G::new(r"LD \R[r],(\IDX[x]\D[d])", "11x11101 01rrr110 dddddddd", 19, K::LdRMem(Index)),
    G::new(r"LD (\IDX[x]\D[d]),\R[s]", "11x11101 01110sss dddddddd", 19, K::LdMemR(Index)),
    G::new(r"\ALU[o](\IDX[x]\D[d])", "11x11101 10ooo110 dddddddd", 19, K::AluMem(Index)),
    G::new(r"POP \IDX[x]", "11x11101 11100001", 14, K::PopIndex),
    G::new(r"PUSH \IDX[x]", "11x11101 11100101", 15, K::PushIndex),
    G::new(r"EX (SP),\IDX[x]", "11x11101 11100011", 23, K::ExSp(Index)),
    G::new(r"JP (\IDX[x])", "11x11101 11101001", 8, K::JpWide(Index)),
    G::new(r"LD SP,\IDX[x]", "11x11101 11111001", 10, K::LdSpWide(Index)),
    // DD CB / FD CB: displacement comes before the operation byte
    G::new(
        r"\ROT[o] (\IDX[x]\D[d])",
        "11x11101 11001011 dddddddd 00ooo110",
        23,
        K::ShiftMem(Index),
    ),
    G::new(
        r"BIT \BIT[b],(\IDX[x]\D[d])",
        "11x11101 11001011 dddddddd 01bbb110",
        20,
        K::BitMem(Index),
    ),
    G::new(
        r"RES \BIT[b],(\IDX[x]\D[d])",
        "11x11101 11001011 dddddddd 10bbb110",
        23,
        K::ResMem(Index),
    ),
    G::new(
        r"SET \BIT[b],(\IDX[x]\D[d])",
        "11x11101 11001011 dddddddd 11bbb110",
        23,
        K::SetMem(Index),
    ),
    // ED: extended
    G::new(r"IN \R[r],(C)", "11101101 01rrr000", 12, K::InRC),
    G::new(r"OUT (C),\R[r]", "11101101 01rrr001", 12, K::OutCR),
    G::new(r"SBC HL,\RP[p]", "11101101 01pp0010", 15, K::SbcHl),
    G::new(r"ADC HL,\RP[p]", "11101101 01pp1010", 15, K::AdcHl),
    G::new(r"LD (\NN[n]),\RP[p]", "11101101 01pp0011 nnnnnnnn nnnnnnnn", 20, K::StoreRp),
    G::new(r"LD \RP[p],(\NN[n])", "11101101 01pp1011 nnnnnnnn nnnnnnnn", 20, K::LoadRp),
    G::new("NEG", "11101101 01000100", 8, K::Neg),
    G::new("RETN", "11101101 01000101", 14, K::Retn),
    G::new("RETI", "11101101 01001101", 14, K::Reti),
    G::new(r"IM \IM[m]", "11101101 010mm110", 8, K::Im),
    G::new("LD I,A", "11101101 01000111", 9, K::LdIA),
    G::new("LD R,A", "11101101 01001111", 9, K::LdRA),
    G::new("LD A,I", "11101101 01010111", 9, K::LdAI),
    G::new("LD A,R", "11101101 01011111", 9, K::LdAR),
    G::new("RRD", "11101101 01100111", 18, K::Rrd),
    G::new("RLD", "11101101 01101111", 18, K::Rld),
    G::new(r"LD\ID[i]", "11101101 1010i000", 16, K::BlockLoad { repeat: false }),
    G::new(r"CP\ID[i]", "11101101 1010i001", 16, K::BlockCompare { repeat: false }),
    G::new(r"IN\ID[i]", "11101101 1010i010", 16, K::BlockIn { repeat: false }),
    G::new(r"OUT\ID[i]", "11101101 1010i011", 16, K::BlockOut { repeat: false }),
    G::conditional(r"LD\ID[i]R", "11101101 1011i000", 21, 16, K::BlockLoad { repeat: true }),
    G::conditional(r"CP\ID[i]R", "11101101 1011i001", 21, 16, K::BlockCompare { repeat: true }),
    G::conditional(r"IN\ID[i]R", "11101101 1011i010", 21, 16, K::BlockIn { repeat: true }),
    G::conditional(r"OT\ID[i]R", "11101101 1011i011", 21, 16, K::BlockOut { repeat: true }),
];
