//! Z80 register set.
//!
//! Eight-bit cells are stored individually and register pairs are composed
//! from them on the fly, so writing BC is visible in B and C and vice versa.
//! IX, IY, SP and PC are 16-bit cells of their own. [`Indirect`] is the
//! pseudo-register `(HL)` / `(IX+d)`: its storage is a memory cell.

use core::fmt;

use emu_core::Bus;

/// Eight-bit registers, including the alternate bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg8 {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    I,
    R,
    AAlt,
    FAlt,
    BAlt,
    CAlt,
    DAlt,
    EAlt,
    HAlt,
    LAlt,
}

impl Reg8 {
    /// Register selected by the standard 3-bit encoding (B C D E H L - A).
    /// Encoding 6 means `(HL)` and has no register.
    #[must_use]
    pub const fn from_field(field: u32) -> Option<Self> {
        match field & 7 {
            0 => Some(Self::B),
            1 => Some(Self::C),
            2 => Some(Self::D),
            3 => Some(Self::E),
            4 => Some(Self::H),
            5 => Some(Self::L),
            7 => Some(Self::A),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::F => "F",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::H => "H",
            Self::L => "L",
            Self::I => "I",
            Self::R => "R",
            Self::AAlt => "A'",
            Self::FAlt => "F'",
            Self::BAlt => "B'",
            Self::CAlt => "C'",
            Self::DAlt => "D'",
            Self::EAlt => "E'",
            Self::HAlt => "H'",
            Self::LAlt => "L'",
        }
    }
}

/// Sixteen-bit registers and register pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg16 {
    AF,
    BC,
    DE,
    HL,
    IX,
    IY,
    SP,
    PC,
    AFAlt,
    BCAlt,
    DEAlt,
    HLAlt,
}

impl Reg16 {
    /// Pair selected by the 2-bit arithmetic encoding (BC DE HL SP).
    #[must_use]
    pub const fn from_rp(field: u32) -> Self {
        match field & 3 {
            0 => Self::BC,
            1 => Self::DE,
            2 => Self::HL,
            _ => Self::SP,
        }
    }

    /// Pair selected by the 2-bit stack encoding (BC DE HL AF).
    #[must_use]
    pub const fn from_rq(field: u32) -> Self {
        match field & 3 {
            0 => Self::BC,
            1 => Self::DE,
            2 => Self::HL,
            _ => Self::AF,
        }
    }

    /// Index register selected by the DD/FD prefix bit.
    #[must_use]
    pub const fn index(field: u32) -> Self {
        if field & 1 == 0 { Self::IX } else { Self::IY }
    }

    /// The (high, low) byte registers a pair is composed of, if any.
    #[must_use]
    pub const fn halves(self) -> Option<(Reg8, Reg8)> {
        match self {
            Self::AF => Some((Reg8::A, Reg8::F)),
            Self::BC => Some((Reg8::B, Reg8::C)),
            Self::DE => Some((Reg8::D, Reg8::E)),
            Self::HL => Some((Reg8::H, Reg8::L)),
            Self::AFAlt => Some((Reg8::AAlt, Reg8::FAlt)),
            Self::BCAlt => Some((Reg8::BAlt, Reg8::CAlt)),
            Self::DEAlt => Some((Reg8::DAlt, Reg8::EAlt)),
            Self::HLAlt => Some((Reg8::HAlt, Reg8::LAlt)),
            Self::IX | Self::IY | Self::SP | Self::PC => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AF => "AF",
            Self::BC => "BC",
            Self::DE => "DE",
            Self::HL => "HL",
            Self::IX => "IX",
            Self::IY => "IY",
            Self::SP => "SP",
            Self::PC => "PC",
            Self::AFAlt => "AF'",
            Self::BCAlt => "BC'",
            Self::DEAlt => "DE'",
            Self::HLAlt => "HL'",
        }
    }
}

/// Any register, for the uniform get/set/increment/decrement contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Byte(Reg8),
    Word(Reg16),
}

impl Register {
    /// Every register a debugger shows, in display order.
    pub const ALL: [Self; 18] = [
        Self::Word(Reg16::PC),
        Self::Word(Reg16::SP),
        Self::Word(Reg16::AF),
        Self::Word(Reg16::BC),
        Self::Word(Reg16::DE),
        Self::Word(Reg16::HL),
        Self::Word(Reg16::IX),
        Self::Word(Reg16::IY),
        Self::Word(Reg16::AFAlt),
        Self::Word(Reg16::BCAlt),
        Self::Word(Reg16::DEAlt),
        Self::Word(Reg16::HLAlt),
        Self::Byte(Reg8::A),
        Self::Byte(Reg8::F),
        Self::Byte(Reg8::B),
        Self::Byte(Reg8::C),
        Self::Byte(Reg8::I),
        Self::Byte(Reg8::R),
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte(r) => r.name(),
            Self::Word(r) => r.name(),
        }
    }

    /// Width in bits.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Byte(_) => 8,
            Self::Word(_) => 16,
        }
    }

    /// Largest value the register holds.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Byte(_) => 0x00FF,
            Self::Word(_) => 0xFFFF,
        }
    }

    /// Value after a CPU reset.
    #[must_use]
    pub const fn reset_value(self) -> u16 {
        match self {
            Self::Byte(Reg8::A | Reg8::F) => 0xFF,
            Self::Word(Reg16::AF | Reg16::SP) => 0xFFFF,
            _ => 0,
        }
    }
}

impl From<Reg8> for Register {
    fn from(r: Reg8) -> Self {
        Self::Byte(r)
    }
}

impl From<Reg16> for Register {
    fn from(r: Reg16) -> Self {
        Self::Word(r)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Z80 register file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    // Main registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    // Alternate registers
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,

    // Index registers
    pub ix: u16,
    pub iy: u16,

    // Other registers
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
}

impl Registers {
    /// A register file in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        let mut regs = Self::default();
        regs.reset();
        regs
    }

    /// Restore every register to its reset value.
    pub fn reset(&mut self) {
        *self = Self::default();
        for reg in [Reg16::AF, Reg16::SP] {
            self.reset_register(reg.into());
        }
    }

    /// Restore one register to its reset value.
    pub fn reset_register(&mut self, reg: Register) {
        self.set(reg, reg.reset_value());
    }

    /// Read a register, zero-extended to 16 bits.
    #[must_use]
    pub fn get(&self, reg: Register) -> u16 {
        match reg {
            Register::Byte(r) => u16::from(self.get8(r)),
            Register::Word(r) => self.get16(r),
        }
    }

    /// Write a register. The value is masked to the register's width.
    pub fn set(&mut self, reg: Register, value: u16) {
        match reg {
            Register::Byte(r) => self.set8(r, value as u8),
            Register::Word(r) => self.set16(r, value),
        }
    }

    /// Add one. Returns true if the register wrapped from its maximum to 0.
    pub fn increment(&mut self, reg: Register) -> bool {
        let next = self.get(reg).wrapping_add(1) & reg.mask();
        self.set(reg, next);
        next == 0
    }

    /// Subtract one. Returns true if the register wrapped from 0 to its
    /// maximum.
    pub fn decrement(&mut self, reg: Register) -> bool {
        let next = self.get(reg).wrapping_sub(1) & reg.mask();
        self.set(reg, next);
        next == reg.mask()
    }

    #[must_use]
    pub fn get8(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::A => self.a,
            Reg8::F => self.f,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
            Reg8::I => self.i,
            Reg8::R => self.r,
            Reg8::AAlt => self.a_alt,
            Reg8::FAlt => self.f_alt,
            Reg8::BAlt => self.b_alt,
            Reg8::CAlt => self.c_alt,
            Reg8::DAlt => self.d_alt,
            Reg8::EAlt => self.e_alt,
            Reg8::HAlt => self.h_alt,
            Reg8::LAlt => self.l_alt,
        }
    }

    pub fn set8(&mut self, reg: Reg8, value: u8) {
        let cell = match reg {
            Reg8::A => &mut self.a,
            Reg8::F => &mut self.f,
            Reg8::B => &mut self.b,
            Reg8::C => &mut self.c,
            Reg8::D => &mut self.d,
            Reg8::E => &mut self.e,
            Reg8::H => &mut self.h,
            Reg8::L => &mut self.l,
            Reg8::I => &mut self.i,
            Reg8::R => &mut self.r,
            Reg8::AAlt => &mut self.a_alt,
            Reg8::FAlt => &mut self.f_alt,
            Reg8::BAlt => &mut self.b_alt,
            Reg8::CAlt => &mut self.c_alt,
            Reg8::DAlt => &mut self.d_alt,
            Reg8::EAlt => &mut self.e_alt,
            Reg8::HAlt => &mut self.h_alt,
            Reg8::LAlt => &mut self.l_alt,
        };
        *cell = value;
    }

    #[must_use]
    pub fn get16(&self, reg: Reg16) -> u16 {
        match reg {
            Reg16::IX => self.ix,
            Reg16::IY => self.iy,
            Reg16::SP => self.sp,
            Reg16::PC => self.pc,
            pair => match pair.halves() {
                Some((hi, lo)) => u16::from_be_bytes([self.get8(hi), self.get8(lo)]),
                None => unreachable!("{} is a plain 16-bit register", pair.name()),
            },
        }
    }

    pub fn set16(&mut self, reg: Reg16, value: u16) {
        match reg {
            Reg16::IX => self.ix = value,
            Reg16::IY => self.iy = value,
            Reg16::SP => self.sp = value,
            Reg16::PC => self.pc = value,
            pair => {
                if let Some((hi, lo)) = pair.halves() {
                    let [h, l] = value.to_be_bytes();
                    self.set8(hi, h);
                    self.set8(lo, l);
                }
            }
        }
    }

    /// Get AF register pair.
    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    /// Get BC register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    /// Get DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    /// Get HL register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    /// EX AF,AF'
    pub fn exchange_af(&mut self) {
        core::mem::swap(&mut self.a, &mut self.a_alt);
        core::mem::swap(&mut self.f, &mut self.f_alt);
    }

    /// EXX
    pub fn exchange_main(&mut self) {
        core::mem::swap(&mut self.b, &mut self.b_alt);
        core::mem::swap(&mut self.c, &mut self.c_alt);
        core::mem::swap(&mut self.d, &mut self.d_alt);
        core::mem::swap(&mut self.e, &mut self.e_alt);
        core::mem::swap(&mut self.h, &mut self.h_alt);
        core::mem::swap(&mut self.l, &mut self.l_alt);
    }

    /// Advance the refresh counter. Bit 7 is only ever changed by LD R,A.
    pub fn refresh(&mut self, m1_cycles: u8) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(m1_cycles) & 0x7F);
    }
}

/// A memory cell addressed through a 16-bit register plus a displacement:
/// `(HL)`, `(IX+d)` or `(IY+d)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indirect {
    pub base: Reg16,
    pub displacement: i8,
}

impl Indirect {
    #[must_use]
    pub const fn new(base: Reg16, displacement: i8) -> Self {
        Self { base, displacement }
    }

    /// The effective address.
    #[must_use]
    pub fn address(&self, regs: &Registers) -> u16 {
        regs.get16(self.base).wrapping_add_signed(i16::from(self.displacement))
    }

    pub fn get<B: Bus>(&self, regs: &Registers, bus: &mut B) -> u8 {
        bus.read(self.address(regs))
    }

    pub fn set<B: Bus>(&self, regs: &Registers, bus: &mut B, value: u8) {
        bus.write(self.address(regs), value);
    }

    /// Add one to the memory cell. Returns true if it wrapped to 0.
    pub fn increment<B: Bus>(&self, regs: &Registers, bus: &mut B) -> bool {
        let next = self.get(regs, bus).wrapping_add(1);
        self.set(regs, bus, next);
        next == 0
    }

    /// Subtract one from the memory cell. Returns true if it wrapped to 0xFF.
    pub fn decrement<B: Bus>(&self, regs: &Registers, bus: &mut B) -> bool {
        let next = self.get(regs, bus).wrapping_sub(1);
        self.set(regs, bus, next);
        next == 0xFF
    }
}
