//! Concrete operations.
//!
//! An [`Operation`] is a generic operation bound to the bytes it was decoded
//! from. The host owns one and hands it to every fetch, which overwrites it
//! in place.

use std::fmt;
use std::sync::Arc;

use emu_core::IoBus;

use crate::catalog::{GenericOperation, OpKind};
use crate::cpu::Z80;
use crate::error::{ByteTrace, DecodeError};
use crate::fetcher::CodeFetcher;
use crate::functions::Template;
use crate::pattern::{FIELD_COUNT, MAX_BYTES, Pattern, field_index};

/// A decoded instruction, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    generic: Option<&'static GenericOperation>,
    template: Option<Arc<Template<'static>>>,
    args: [u32; FIELD_COUNT],
    bytes: [u8; MAX_BYTES],
    len: u8,
    address: u16,
    pc_advance: u16,
    alternate: bool,
    overhead: u32,
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generic: None,
            template: None,
            args: [0; FIELD_COUNT],
            bytes: [0; MAX_BYTES],
            len: 0,
            address: 0,
            pc_advance: 0,
            alternate: false,
            overhead: 0,
        }
    }

    /// Clear the buffer for the next fetch.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Bind `generic` to the bytes the fetcher produced. The fetcher is
    /// replayed from its first byte. `pc_advance` is how far the program
    /// counter moves past the instruction: its length when fetched from
    /// memory, 0 when it came off the data bus.
    pub(crate) fn instantiate<F: CodeFetcher + ?Sized>(
        &mut self,
        generic: &'static GenericOperation,
        pattern: &Pattern,
        template: Arc<Template<'static>>,
        fetcher: &mut F,
        address: u16,
        from_memory: bool,
    ) -> Result<(), DecodeError> {
        self.generic = Some(generic);
        self.template = Some(template);
        self.address = address;
        self.alternate = false;

        let matched = pattern.extract(fetcher, &mut self.args);
        let consumed = fetcher.consumed();
        let len = consumed.len().min(MAX_BYTES);
        self.bytes = [0; MAX_BYTES];
        self.bytes[..len].copy_from_slice(&consumed[..len]);
        self.len = len as u8;

        if !matched {
            return Err(DecodeError::PatternMismatch {
                address,
                mnemonic: generic.mnemonic,
                bytes: ByteTrace(consumed.to_vec()),
            });
        }

        self.pc_advance = if from_memory { u16::from(self.len) } else { 0 };
        Ok(())
    }

    /// Apply the operation's effect. Same as [`Z80::execute`].
    pub fn execute<B: IoBus>(&mut self, cpu: &mut Z80, bus: &mut B) {
        cpu.execute(self, bus);
    }

    #[must_use]
    pub fn generic(&self) -> Option<&'static GenericOperation> {
        self.generic
    }

    #[must_use]
    pub fn kind(&self) -> Option<OpKind> {
        self.generic.map(|g| g.kind)
    }

    /// Value of the field named `letter`; 0 if the pattern has no such field.
    #[must_use]
    pub fn arg(&self, letter: char) -> u32 {
        field_index(letter).map_or(0, |i| self.args[i])
    }

    #[must_use]
    pub fn args(&self) -> &[u32; FIELD_COUNT] {
        &self.args
    }

    /// The opcode bytes the operation was decoded from.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address the operation was fetched from.
    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }

    #[must_use]
    pub fn pc_advance(&self) -> u16 {
        self.pc_advance
    }

    /// Whether the last execution took the alternate path (branch not taken,
    /// block loop finished).
    #[must_use]
    pub fn is_alternate(&self) -> bool {
        self.alternate
    }

    pub(crate) fn set_alternate(&mut self, alternate: bool) {
        self.alternate = alternate;
    }

    /// Clock periods spent accepting interrupts before this operation.
    #[must_use]
    pub fn overhead(&self) -> u32 {
        self.overhead
    }

    pub(crate) fn add_overhead(&mut self, periods: u32) {
        self.overhead += periods;
    }

    /// Clock periods the operation takes, including any interrupt
    /// acceptance that preceded it. Meaningful after `execute`.
    #[must_use]
    pub fn clock_periods(&self) -> u32 {
        let base = self.generic.map_or(0, |g| {
            if self.alternate { g.alt_cycles } else { g.cycles }
        });
        base + self.overhead
    }

    /// Opcode fetch (M1) cycles: two for prefixed instructions.
    #[must_use]
    pub fn m1_cycles(&self) -> u8 {
        match self.bytes().first() {
            Some(0xCB | 0xDD | 0xED | 0xFD) => 2,
            _ => 1,
        }
    }

    /// The instruction in assembler syntax, e.g. `LD (IX+$05),$2A`.
    #[must_use]
    pub fn mnemonic(&self) -> String {
        let next_pc = self.address.wrapping_add(u16::from(self.len));
        self.template
            .as_ref()
            .map_or_else(String::new, |t| t.render(&self.args, next_pc))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = ByteTrace(self.bytes().to_vec()).to_string();
        write!(f, "{:04X}  {bytes:<11}  {}", self.address, self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;
    use crate::decode::DecodeTable;
    use crate::fetcher::{BusDataFetcher, MemoryFetcher};
    use emu_core::SimpleBus;

    fn entry(kind: OpKind) -> &'static GenericOperation {
        CATALOG.iter().find(|g| g.kind == kind).unwrap()
    }

    fn template(generic: &'static GenericOperation) -> Arc<Template<'static>> {
        Arc::new(Template::parse(generic.mnemonic).unwrap())
    }

    #[test]
    fn instantiate_binds_fields_and_bytes() {
        let generic = entry(OpKind::LdMemImm(crate::catalog::Base::Index));
        let pattern = Pattern::parse(generic.pattern).unwrap();
        let mut bus = SimpleBus::new();
        bus.load(0x4000, &[0xDD, 0x36, 0x05, 0x2A]);
        let mut fetcher = MemoryFetcher::new(&mut bus, 0x4000);

        let mut op = Operation::new();
        op.instantiate(generic, &pattern, template(generic), &mut fetcher, 0x4000, true)
            .unwrap();
        assert_eq!(op.bytes(), &[0xDD, 0x36, 0x05, 0x2A]);
        assert_eq!(op.arg('x'), 0);
        assert_eq!(op.arg('d'), 5);
        assert_eq!(op.arg('n'), 0x2A);
        assert_eq!(op.pc_advance(), 4);
        assert_eq!(op.m1_cycles(), 2);
        assert_eq!(op.mnemonic(), "LD (IX+$05),$2A");
        assert_eq!(op.to_string(), "4000  DD 36 05 2A  LD (IX+$05),$2A");
    }

    #[test]
    fn mnemonic_renders_from_the_table_template() {
        let table = DecodeTable::standard();
        let mut bus = SimpleBus::new();
        bus.load(0x0100, &[0x3E, 0x2A]);
        let mut fetcher = MemoryFetcher::new(&mut bus, 0x0100);
        let (generic, compiled) = table.lookup_compiled(&mut fetcher).unwrap();

        let mut op = Operation::new();
        op.instantiate(
            generic,
            &compiled.pattern,
            Arc::clone(&compiled.template),
            &mut fetcher,
            0x0100,
            true,
        )
        .unwrap();
        assert!(Arc::ptr_eq(op.template.as_ref().unwrap(), &compiled.template));
        assert_eq!(op.mnemonic(), "LD A,$2A");

        op.reset();
        assert_eq!(op.mnemonic(), "");
    }

    #[test]
    fn bus_fetched_operations_do_not_advance() {
        let generic = entry(OpKind::Rst);
        let pattern = Pattern::parse(generic.pattern).unwrap();
        let mut fetcher = BusDataFetcher::new(0xEF);
        let mut op = Operation::new();
        op.instantiate(generic, &pattern, template(generic), &mut fetcher, 0x1234, false)
            .unwrap();
        assert_eq!(op.pc_advance(), 0);
        assert_eq!(op.mnemonic(), "RST $28");
    }

    #[test]
    fn mismatch_is_reported() {
        let generic = entry(OpKind::Nop);
        let pattern = Pattern::parse(generic.pattern).unwrap();
        let mut fetcher = BusDataFetcher::new(0x01);
        let mut op = Operation::new();
        let err = op
            .instantiate(generic, &pattern, template(generic), &mut fetcher, 0, false)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn clock_periods_follow_path_and_overhead() {
        let generic = entry(OpKind::JrCond);
        let pattern = Pattern::parse(generic.pattern).unwrap();
        let mut bus = SimpleBus::new();
        bus.load(0, &[0x20, 0xFE]);
        let mut fetcher = MemoryFetcher::new(&mut bus, 0);
        let mut op = Operation::new();
        op.instantiate(generic, &pattern, template(generic), &mut fetcher, 0, true).unwrap();
        assert_eq!(op.mnemonic(), "JR NZ,$0000");
        assert_eq!(op.clock_periods(), 12);
        op.set_alternate(true);
        assert_eq!(op.clock_periods(), 7);
        op.add_overhead(13);
        assert_eq!(op.clock_periods(), 20);
        op.reset();
        assert_eq!(op.clock_periods(), 0);
        assert!(op.is_empty());
    }
}
