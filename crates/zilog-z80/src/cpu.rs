//! Z80 CPU: interrupt acceptance, instruction fetch and execution.

use std::sync::Arc;

use emu_core::{Bus, Cpu, IoBus, Observable, Ticks, Value};
use log::{Level, debug, log_enabled, trace};

use crate::catalog::{CATALOG, GenericOperation};
use crate::decode::{CollisionPolicy, DecodeTable};
use crate::error::{ByteTrace, CatalogError, DecodeError};
use crate::fetcher::{BusDataFetcher, CodeFetcher, MemoryFetcher};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::interrupt::{InterruptLines, InterruptMode, InterruptRequester};
use crate::operation::Operation;
use crate::registers::{Register, Registers};

/// NMI service routine address.
const NMI_VECTOR: u16 = 0x0066;

/// Mode 1 service routine address.
const IM1_VECTOR: u16 = 0x0038;

/// Clock periods spent accepting each kind of interrupt.
const NMI_PERIODS: u32 = 11;
const IM0_PERIODS: u32 = 2;
const IM1_PERIODS: u32 = 13;
const IM2_PERIODS: u32 = 19;

/// Construction options for [`Z80`].
#[derive(Debug, Clone, Copy)]
pub struct Z80Config {
    /// Instructions the decoder recognises.
    pub catalog: &'static [GenericOperation],
    /// How the decode table resolves overlapping catalog entries.
    pub collision_policy: CollisionPolicy,
}

impl Default for Z80Config {
    fn default() -> Self {
        Self {
            catalog: CATALOG,
            collision_policy: CollisionPolicy::FirstDeclared,
        }
    }
}

/// One entry of [`Z80::register_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub register: Register,
    pub name: &'static str,
    pub value: u16,
    pub reset_value: u16,
}

/// Z80 CPU.
///
/// The CPU does not own the bus. The host passes it to each fetch and
/// execute, and keeps one [`Operation`] buffer that every fetch overwrites.
pub struct Z80 {
    pub(crate) regs: Registers,
    table: Arc<DecodeTable>,
    lines: Arc<InterruptLines>,

    // Interrupt control
    pub(crate) iff1: bool,
    pub(crate) iff2: bool,
    pub(crate) mode: InterruptMode,
    pub(crate) irq_serving: bool,
    pub(crate) nmi_serving: bool,
    /// Set by EI: interrupts are not accepted before the next instruction.
    pub(crate) ei_delay: bool,

    /// The last executed operation was HALT.
    pub(crate) halted: bool,

    total_ticks: Ticks,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// A Z80 decoding the built-in catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(DecodeTable::standard())
    }

    /// A Z80 decoding the configured catalog.
    pub fn with_config(config: Z80Config) -> Result<Self, CatalogError> {
        let standard = std::ptr::eq(config.catalog, CATALOG)
            && config.collision_policy == CollisionPolicy::FirstDeclared;
        let table = if standard {
            DecodeTable::standard()
        } else {
            Arc::new(DecodeTable::build_with(
                config.catalog,
                config.collision_policy,
            )?)
        };
        Ok(Self::with_table(table))
    }

    /// A Z80 decoding with an already built table.
    #[must_use]
    pub fn with_table(table: Arc<DecodeTable>) -> Self {
        Self {
            regs: Registers::new(),
            table,
            lines: Arc::new(InterruptLines::new()),
            iff1: false,
            iff2: false,
            mode: InterruptMode::Mode0,
            irq_serving: false,
            nmi_serving: false,
            ei_delay: false,
            halted: false,
            total_ticks: Ticks::ZERO,
        }
    }

    #[must_use]
    pub fn decode_table(&self) -> &Arc<DecodeTable> {
        &self.table
    }

    /// Accept any pending interrupt, then decode the next instruction into
    /// `op`.
    ///
    /// An accepted NMI, mode 1 or mode 2 interrupt redirects the program
    /// counter and the real instruction is then fetched from the service
    /// routine. A mode 0 interrupt decodes the instruction from the bus data
    /// byte instead of memory. Otherwise the instruction comes from memory at
    /// PC and PC is advanced past it.
    ///
    /// On error the program counter is left at the failing instruction.
    pub fn fetch_next_operation<B: IoBus>(
        &mut self,
        bus: &mut B,
        op: &mut Operation,
    ) -> Result<(), DecodeError> {
        op.reset();
        let irq_blocked = std::mem::take(&mut self.ei_delay);

        loop {
            if self.lines.take_nmi() {
                self.accept_nmi(bus, op);
                continue;
            }
            if self.iff1 && !irq_blocked && self.lines.take_irq() {
                if self.accept_irq(bus, op) {
                    continue;
                }
                // Mode 0: the device supplies the instruction.
                let address = self.regs.pc;
                let mut fetcher = BusDataFetcher::new(self.lines.vector());
                self.decode(&mut fetcher, op, address, false)?;
                self.regs.refresh(op.m1_cycles());
                self.trace_fetch(op);
                return Ok(());
            }
            break;
        }

        let address = self.regs.pc;
        let mut fetcher = MemoryFetcher::new(bus, address);
        self.decode(&mut fetcher, op, address, true)?;
        self.regs.pc = address.wrapping_add(op.pc_advance());
        self.regs.refresh(op.m1_cycles());
        self.trace_fetch(op);
        Ok(())
    }

    fn decode<F: CodeFetcher + ?Sized>(
        &self,
        fetcher: &mut F,
        op: &mut Operation,
        address: u16,
        from_memory: bool,
    ) -> Result<(), DecodeError> {
        match self.table.lookup_compiled(fetcher) {
            Some((generic, compiled)) => op.instantiate(
                generic,
                &compiled.pattern,
                Arc::clone(&compiled.template),
                fetcher,
                address,
                from_memory,
            ),
            None => Err(DecodeError::InvalidOpcode {
                address,
                bytes: ByteTrace(fetcher.consumed().to_vec()),
            }),
        }
    }

    fn trace_fetch(&self, op: &Operation) {
        if log_enabled!(Level::Trace) {
            trace!("{op}");
        }
    }

    /// A halted CPU resumes after the HALT instruction.
    fn leave_halt(&mut self) {
        if self.halted {
            self.halted = false;
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
    }

    fn accept_nmi<B: Bus>(&mut self, bus: &mut B, op: &mut Operation) {
        self.leave_halt();
        debug!("NMI accepted at {:04X}", self.regs.pc);
        self.nmi_serving = true;
        self.iff2 = self.iff1;
        self.iff1 = false;
        self.push(bus, self.regs.pc);
        self.regs.pc = NMI_VECTOR;
        self.regs.refresh(1);
        op.add_overhead(NMI_PERIODS);
    }

    /// Accept the maskable interrupt. Returns false for mode 0, where the
    /// caller decodes the instruction from the data bus.
    fn accept_irq<B: Bus>(&mut self, bus: &mut B, op: &mut Operation) -> bool {
        self.leave_halt();
        debug!("IRQ accepted at {:04X} in {}", self.regs.pc, self.mode);
        self.irq_serving = true;
        self.iff1 = false;
        self.iff2 = false;

        match self.mode {
            InterruptMode::Mode0 => {
                // No push here: the bus instruction (RST, CALL) stacks PC itself.
                op.add_overhead(IM0_PERIODS);
                false
            }
            InterruptMode::Mode1 => {
                self.push(bus, self.regs.pc);
                self.regs.pc = IM1_VECTOR;
                self.regs.refresh(1);
                op.add_overhead(IM1_PERIODS);
                true
            }
            InterruptMode::Mode2 => {
                self.push(bus, self.regs.pc);
                let table = (u16::from(self.regs.i) << 8) | u16::from(self.lines.vector() & 0xFE);
                self.regs.pc = bus.read_word(table);
                self.regs.refresh(1);
                op.add_overhead(IM2_PERIODS);
                true
            }
        }
    }

    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        bus.write_word(self.regs.sp, value);
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let value = bus.read_word(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    // Interrupt requests

    /// Raise the maskable interrupt. It stays pending until accepted.
    pub fn request_irq(&self) {
        self.lines.request_irq();
    }

    pub fn request_nmi(&self) {
        self.lines.request_nmi();
    }

    /// Byte the interrupting device puts on the data bus.
    pub fn set_interrupt_response_vector(&self, value: u8) {
        self.lines.set_vector(value);
    }

    /// A handle for raising interrupts from other components or threads.
    #[must_use]
    pub fn requester(&self) -> InterruptRequester {
        InterruptRequester::new(Arc::clone(&self.lines))
    }

    // Interrupt state

    #[must_use]
    pub fn irq_requested(&self) -> bool {
        self.lines.irq_pending()
    }

    #[must_use]
    pub fn nmi_requested(&self) -> bool {
        self.lines.nmi_pending()
    }

    #[must_use]
    pub fn irq_serving(&self) -> bool {
        self.irq_serving
    }

    #[must_use]
    pub fn nmi_serving(&self) -> bool {
        self.nmi_serving
    }

    /// IFF1: maskable interrupts are accepted.
    #[must_use]
    pub fn irq_enabled(&self) -> bool {
        self.iff1
    }

    #[must_use]
    pub fn iff2(&self) -> bool {
        self.iff2
    }

    #[must_use]
    pub fn interrupt_mode(&self) -> InterruptMode {
        self.mode
    }

    /// Total clock periods executed since creation or reset.
    #[must_use]
    pub const fn total_ticks(&self) -> Ticks {
        self.total_ticks
    }

    pub(crate) fn add_ticks(&mut self, periods: u32) {
        self.total_ticks += periods;
    }

    // Debugger access

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
        self.halted = false;
    }

    #[must_use]
    pub fn sp(&self) -> u16 {
        self.regs.sp
    }

    pub fn set_sp(&mut self, value: u16) {
        self.regs.sp = value;
    }

    /// Every register with its current and reset value, in display order.
    #[must_use]
    pub fn register_list(&self) -> Vec<RegisterInfo> {
        Register::ALL
            .iter()
            .map(|&register| RegisterInfo {
                register,
                name: register.name(),
                value: self.regs.get(register),
                reset_value: register.reset_value(),
            })
            .collect()
    }

    #[must_use]
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    /// Direct register access for tests.
    #[cfg(feature = "test-utils")]
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    #[cfg(feature = "test-utils")]
    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) {
        self.mode = mode;
    }

    #[cfg(feature = "test-utils")]
    pub fn set_interrupt_flip_flops(&mut self, iff1: bool, iff2: bool) {
        self.iff1 = iff1;
        self.iff2 = iff2;
    }
}

// Instruction effects live in their own file
mod execute;

impl Cpu for Z80 {
    type Registers = Registers;
    type Error = DecodeError;

    fn step<B: IoBus>(&mut self, bus: &mut B) -> Result<Ticks, DecodeError> {
        let mut op = Operation::new();
        self.fetch_next_operation(bus, &mut op)?;
        self.execute(&mut op, bus);
        Ok(Ticks::from(op.clock_periods()))
    }

    fn pc(&self) -> u32 {
        u32::from(self.regs.pc)
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn interrupt(&mut self) -> bool {
        self.lines.request_irq();
        self.iff1
    }

    fn nmi(&mut self) {
        self.lines.request_nmi();
    }

    fn reset(&mut self) {
        self.regs.reset();
        self.lines.clear();
        self.iff1 = false;
        self.iff2 = false;
        self.mode = InterruptMode::Mode0;
        self.irq_serving = false;
        self.nmi_serving = false;
        self.ei_delay = false;
        self.halted = false;
        self.total_ticks = Ticks::ZERO;
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l",
    "af", "bc", "de", "hl",
    "af'", "bc'", "de'", "hl'",
    "ix", "iy", "sp", "pc", "i", "r",
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    "iff1", "iff2", "im",
    "irq.requested", "irq.serving", "nmi.requested", "nmi.serving",
    "halted", "ticks",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        use crate::registers::Reg16;

        let flag = |bit: u8| Some(Value::from(self.regs.f & bit != 0));
        match path {
            "a" => Some(self.regs.a.into()),
            "f" => Some(self.regs.f.into()),
            "b" => Some(self.regs.b.into()),
            "c" => Some(self.regs.c.into()),
            "d" => Some(self.regs.d.into()),
            "e" => Some(self.regs.e.into()),
            "h" => Some(self.regs.h.into()),
            "l" => Some(self.regs.l.into()),

            "af" => Some(self.regs.af().into()),
            "bc" => Some(self.regs.bc().into()),
            "de" => Some(self.regs.de().into()),
            "hl" => Some(self.regs.hl().into()),
            "af'" => Some(self.regs.get16(Reg16::AFAlt).into()),
            "bc'" => Some(self.regs.get16(Reg16::BCAlt).into()),
            "de'" => Some(self.regs.get16(Reg16::DEAlt).into()),
            "hl'" => Some(self.regs.get16(Reg16::HLAlt).into()),

            "ix" => Some(self.regs.ix.into()),
            "iy" => Some(self.regs.iy.into()),
            "sp" => Some(self.regs.sp.into()),
            "pc" => Some(self.regs.pc.into()),
            "i" => Some(self.regs.i.into()),
            "r" => Some(self.regs.r.into()),

            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.y" => flag(YF),
            "flags.h" => flag(HF),
            "flags.x" => flag(XF),
            "flags.p" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),

            "iff1" => Some(self.iff1.into()),
            "iff2" => Some(self.iff2.into()),
            "im" => Some(self.mode.number().into()),
            "irq.requested" => Some(self.irq_requested().into()),
            "irq.serving" => Some(self.irq_serving.into()),
            "nmi.requested" => Some(self.nmi_requested().into()),
            "nmi.serving" => Some(self.nmi_serving.into()),

            "halted" => Some(self.halted.into()),
            "ticks" => Some(self.total_ticks.get().into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
