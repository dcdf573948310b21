//! Mnemonic rendering functions and template parsing.
//!
//! A mnemonic template is plain text with embedded calls of the form
//! `\NAME[v]`, where `NAME` names a [`Function`] and `v` is the pattern field
//! letter whose value is passed to it: `LD \R[r],\N[n]` renders as
//! `LD B,$2A`. The same functions bound the values a field may take, which
//! the decode-table builder uses to discard encodings with no rendering.

use crate::error::CatalogError;

/// 8-bit registers in opcode order; 6 is `(HL)` and has its own templates.
static REG8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "", "A"];

/// 16-bit pairs for arithmetic and loads.
static REG_PAIRS: [&str; 4] = ["BC", "DE", "HL", "SP"];

/// 16-bit pairs for PUSH and POP.
static STACK_PAIRS: [&str; 4] = ["BC", "DE", "HL", "AF"];

/// Pairs that can be added to an index register; 2 is the index register
/// itself and has its own template.
static INDEX_ADDENDS: [&str; 4] = ["BC", "DE", "", "SP"];

/// Pointer pairs for `LD (rr),A` and `LD A,(rr)`.
static POINTER_PAIRS: [&str; 2] = ["BC", "DE"];

static CONDITIONS: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];

/// Conditions available to JR.
static SHORT_CONDITIONS: [&str; 4] = ["NZ", "Z", "NC", "C"];

static ALU_OPS: [&str; 8] = [
    "ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP ",
];

/// CB-prefix rotates and shifts; 6 (SLL) is undocumented.
static SHIFT_OPS: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "", "SRL"];

static ACC_ROTATES: [&str; 4] = ["RLCA", "RRCA", "RLA", "RRA"];

static INDEX_REGS: [&str; 2] = ["IX", "IY"];

/// Interrupt modes by their IM opcode field; 1 is undocumented.
static INTERRUPT_MODES: [&str; 4] = ["0", "", "1", "2"];

/// Block instruction direction.
static DIRECTIONS: [&str; 2] = ["I", "D"];

/// A named mnemonic rendering function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Name lookup. Empty entries are holes: the encoding exists in the
    /// opcode space but not for this template.
    Enumeration(&'static [&'static str]),
    /// Unsigned byte in hex.
    Hex8,
    /// Unsigned word in hex.
    Hex16,
    /// Signed 8-bit displacement, `+$05` / `-$03`.
    Displacement,
    /// Signed 8-bit offset resolved against the address of the next
    /// instruction.
    Relative,
    /// Small decimal number (bit index).
    Decimal,
    /// RST vector, encoded as address / 8.
    Restart,
}

impl Function {
    /// Look up a function by its template name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        let function = match name {
            "R" => Self::Enumeration(&REG8),
            "RP" => Self::Enumeration(&REG_PAIRS),
            "RQ" => Self::Enumeration(&STACK_PAIRS),
            "RX" => Self::Enumeration(&INDEX_ADDENDS),
            "BD" => Self::Enumeration(&POINTER_PAIRS),
            "CC" => Self::Enumeration(&CONDITIONS),
            "CJ" => Self::Enumeration(&SHORT_CONDITIONS),
            "ALU" => Self::Enumeration(&ALU_OPS),
            "ROT" => Self::Enumeration(&SHIFT_OPS),
            "ACC" => Self::Enumeration(&ACC_ROTATES),
            "IDX" => Self::Enumeration(&INDEX_REGS),
            "IM" => Self::Enumeration(&INTERRUPT_MODES),
            "ID" => Self::Enumeration(&DIRECTIONS),
            "N" => Self::Hex8,
            "NN" => Self::Hex16,
            "D" => Self::Displacement,
            "REL" => Self::Relative,
            "BIT" => Self::Decimal,
            "RST" => Self::Restart,
            _ => return None,
        };
        Some(function)
    }

    /// Whether `value` has a rendering.
    #[must_use]
    pub fn accepts(self, value: u32) -> bool {
        match self {
            Self::Enumeration(names) => usize::try_from(value)
                .ok()
                .and_then(|i| names.get(i))
                .is_some_and(|name| !name.is_empty()),
            Self::Hex8 | Self::Displacement | Self::Relative => value <= 0xFF,
            Self::Hex16 => value <= 0xFFFF,
            Self::Decimal | Self::Restart => value <= 7,
        }
    }

    /// Render `value`. `next_pc` is the address following the instruction.
    #[must_use]
    pub fn render(self, value: u32, next_pc: u16) -> String {
        match self {
            Self::Enumeration(names) => usize::try_from(value)
                .ok()
                .and_then(|i| names.get(i))
                .map_or_else(|| format!("?{value}"), |name| (*name).to_string()),
            Self::Hex8 => format!("${:02X}", value & 0xFF),
            Self::Hex16 => format!("${:04X}", value & 0xFFFF),
            Self::Displacement => {
                let d = value as u8 as i8;
                if d < 0 {
                    format!("-${:02X}", d.unsigned_abs())
                } else {
                    format!("+${d:02X}")
                }
            }
            Self::Relative => {
                let target = next_pc.wrapping_add_signed(i16::from(value as u8 as i8));
                format!("${target:04X}")
            }
            Self::Decimal => value.to_string(),
            Self::Restart => format!("${:02X}", (value & 7) * 8),
        }
    }
}

/// One piece of a parsed mnemonic template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Call { function: Function, field: u8 },
}

/// A parsed mnemonic template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Template<'a> {
    /// Parse `\NAME[v]` calls out of a mnemonic template.
    pub fn parse(mnemonic: &'a str) -> Result<Self, CatalogError> {
        let mut segments = Vec::new();
        let mut rest = mnemonic;

        while let Some(start) = rest.find('\\') {
            if start > 0 {
                segments.push(Segment::Text(&rest[..start]));
            }
            let call = &rest[start + 1..];
            let open = call.find('[');
            let close = open.and_then(|open| call[open..].find(']').map(|c| open + c));
            let (Some(open), Some(close)) = (open, close) else {
                return Err(CatalogError::MalformedCall {
                    mnemonic: mnemonic.to_string(),
                });
            };
            let name = &call[..open];
            let var = &call[open + 1..close];
            let function = Function::by_name(name).ok_or_else(|| CatalogError::UnknownFunction {
                mnemonic: mnemonic.to_string(),
                name: name.to_string(),
            })?;
            let field = match var.as_bytes() {
                [letter @ b'a'..=b'z'] => letter - b'a',
                _ => {
                    return Err(CatalogError::MalformedCall {
                        mnemonic: mnemonic.to_string(),
                    });
                }
            };
            segments.push(Segment::Call { function, field });
            rest = &call[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// The functions each field is passed to, as (field index, function).
    pub fn constraints(&self) -> impl Iterator<Item = (u8, Function)> + '_ {
        self.segments.iter().filter_map(|segment| match *segment {
            Segment::Call { function, field } => Some((field, function)),
            Segment::Text(_) => None,
        })
    }

    /// Render with field values taken from `args` (indexed by letter).
    #[must_use]
    pub fn render(&self, args: &[u32], next_pc: u16) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match *segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Call { function, field } => {
                    let value = args.get(usize::from(field)).copied().unwrap_or(0);
                    out.push_str(&function.render(value, next_pc));
                }
            }
        }
        out
    }
}
