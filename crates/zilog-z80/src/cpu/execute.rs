//! Instruction effects.

use emu_core::{Bus, IoBus};

use super::Z80;
use crate::alu::{self, AluOp, ShiftOp};
use crate::catalog::{Base, OpKind};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, parity, sz53, sz53p};
use crate::interrupt::InterruptMode;
use crate::operation::Operation;
use crate::registers::{Indirect, Reg8, Reg16};

impl Z80 {
    /// Apply `op` to the CPU and memory. Sets whether the alternate path was
    /// taken and adds the operation's cost to the running total.
    pub fn execute<B: IoBus>(&mut self, op: &mut Operation, bus: &mut B) {
        let Some(kind) = op.kind() else {
            return;
        };
        op.set_alternate(false);
        self.halted = false;

        match kind {
            OpKind::Nop => {}
            OpKind::Halt => {
                // Re-fetch HALT until an interrupt is accepted.
                self.regs.pc = self.regs.pc.wrapping_sub(op.pc_advance());
                self.halted = true;
            }
            OpKind::Di => {
                self.iff1 = false;
                self.iff2 = false;
            }
            OpKind::Ei => {
                self.iff1 = true;
                self.iff2 = true;
                self.ei_delay = true;
            }
            OpKind::Im => {
                if let Some(mode) = InterruptMode::from_field(op.arg('m')) {
                    self.mode = mode;
                }
            }

            // 8-bit loads
            OpKind::LdRR => {
                let value = self.get_r(op.arg('s'));
                self.set_r(op.arg('r'), value);
            }
            OpKind::LdRImm => self.set_r(op.arg('r'), op.arg('n') as u8),
            OpKind::LdRMem(base) => {
                let value = cell(op, base).get(&self.regs, bus);
                self.set_r(op.arg('r'), value);
            }
            OpKind::LdMemR(base) => {
                let value = self.get_r(op.arg('s'));
                cell(op, base).set(&self.regs, bus, value);
            }
            OpKind::LdMemImm(base) => cell(op, base).set(&self.regs, bus, op.arg('n') as u8),
            OpKind::LdAPair => {
                let address = self.regs.get16(Reg16::from_rp(op.arg('p')));
                self.regs.a = bus.read(address);
            }
            OpKind::LdPairA => {
                let address = self.regs.get16(Reg16::from_rp(op.arg('p')));
                bus.write(address, self.regs.a);
            }
            OpKind::LdAAbs => self.regs.a = bus.read(op.arg('n') as u16),
            OpKind::LdAbsA => bus.write(op.arg('n') as u16, self.regs.a),
            OpKind::LdAI | OpKind::LdAR => {
                let value = if kind == OpKind::LdAI {
                    self.regs.i
                } else {
                    self.regs.r
                };
                self.regs.a = value;
                self.regs.f = (self.regs.f & CF) | sz53(value) | if self.iff2 { PF } else { 0 };
            }
            OpKind::LdIA => self.regs.i = self.regs.a,
            OpKind::LdRA => self.regs.r = self.regs.a,

            // 16-bit loads
            OpKind::LdRpImm => self
                .regs
                .set16(Reg16::from_rp(op.arg('p')), op.arg('n') as u16),
            OpKind::LdIndexImm => self.regs.set16(index(op), op.arg('n') as u16),
            OpKind::LoadWide(base) => {
                let value = bus.read_word(op.arg('n') as u16);
                self.regs.set16(wide(op, base), value);
            }
            OpKind::StoreWide(base) => {
                bus.write_word(op.arg('n') as u16, self.regs.get16(wide(op, base)));
            }
            OpKind::LoadRp => {
                let value = bus.read_word(op.arg('n') as u16);
                self.regs.set16(Reg16::from_rp(op.arg('p')), value);
            }
            OpKind::StoreRp => {
                let value = self.regs.get16(Reg16::from_rp(op.arg('p')));
                bus.write_word(op.arg('n') as u16, value);
            }
            OpKind::LdSpWide(base) => self.regs.sp = self.regs.get16(wide(op, base)),
            OpKind::Push => {
                let value = self.regs.get16(Reg16::from_rq(op.arg('q')));
                self.push(bus, value);
            }
            OpKind::Pop => {
                let value = self.pop(bus);
                self.regs.set16(Reg16::from_rq(op.arg('q')), value);
            }
            OpKind::PushIndex => {
                let value = self.regs.get16(index(op));
                self.push(bus, value);
            }
            OpKind::PopIndex => {
                let value = self.pop(bus);
                self.regs.set16(index(op), value);
            }

            // Exchanges
            OpKind::ExAf => self.regs.exchange_af(),
            OpKind::Exx => self.regs.exchange_main(),
            OpKind::ExDeHl => {
                let (de, hl) = (self.regs.de(), self.regs.hl());
                self.regs.set16(Reg16::DE, hl);
                self.regs.set16(Reg16::HL, de);
            }
            OpKind::ExSp(base) => {
                let reg = wide(op, base);
                let top = bus.read_word(self.regs.sp);
                bus.write_word(self.regs.sp, self.regs.get16(reg));
                self.regs.set16(reg, top);
            }

            // 8-bit arithmetic
            OpKind::AluR => {
                let value = self.get_r(op.arg('s'));
                self.alu(op.arg('o'), value);
            }
            OpKind::AluImm => self.alu(op.arg('o'), op.arg('n') as u8),
            OpKind::AluMem(base) => {
                let value = cell(op, base).get(&self.regs, bus);
                self.alu(op.arg('o'), value);
            }
            OpKind::IncR | OpKind::DecR => {
                let r = op.arg('r');
                let value = self.get_r(r);
                let result = if kind == OpKind::IncR {
                    alu::inc8(value)
                } else {
                    alu::dec8(value)
                };
                self.set_r(r, result.value);
                self.regs.f = (self.regs.f & CF) | result.flags;
            }
            OpKind::IncMem(base) | OpKind::DecMem(base) => {
                let target = cell(op, base);
                let value = target.get(&self.regs, bus);
                let result = if matches!(kind, OpKind::IncMem(_)) {
                    alu::inc8(value)
                } else {
                    alu::dec8(value)
                };
                target.set(&self.regs, bus, result.value);
                self.regs.f = (self.regs.f & CF) | result.flags;
            }
            OpKind::Daa => {
                let result = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }
            OpKind::Cpl => {
                self.regs.a = !self.regs.a;
                self.regs.f = (self.regs.f & (SF | ZF | PF | CF))
                    | HF
                    | NF
                    | (self.regs.a & (YF | XF));
            }
            OpKind::Neg => {
                let result = alu::sub8(0, self.regs.a, false);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }
            OpKind::Scf => {
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | (self.regs.a & (YF | XF)) | CF;
            }
            OpKind::Ccf => {
                let carry = self.regs.f & CF != 0;
                self.regs.f = (self.regs.f & (SF | ZF | PF))
                    | (self.regs.a & (YF | XF))
                    | if carry { HF } else { CF };
            }

            // 16-bit arithmetic
            OpKind::IncRp => {
                self.regs.increment(Reg16::from_rp(op.arg('p')).into());
            }
            OpKind::DecRp => {
                self.regs.decrement(Reg16::from_rp(op.arg('p')).into());
            }
            OpKind::IncIndex => {
                self.regs.increment(index(op).into());
            }
            OpKind::DecIndex => {
                self.regs.decrement(index(op).into());
            }
            OpKind::AddHl => self.add16(Reg16::HL, Reg16::from_rp(op.arg('p'))),
            OpKind::AddIndex => self.add16(index(op), Reg16::from_rp(op.arg('p'))),
            OpKind::AddIndexSelf => self.add16(index(op), index(op)),
            OpKind::AdcHl | OpKind::SbcHl => {
                let hl = self.regs.hl();
                let operand = self.regs.get16(Reg16::from_rp(op.arg('p')));
                let carry = self.regs.f & CF != 0;
                let (value, flags) = if kind == OpKind::AdcHl {
                    alu::adc16(hl, operand, carry)
                } else {
                    alu::sbc16(hl, operand, carry)
                };
                self.regs.set16(Reg16::HL, value);
                self.regs.f = flags;
            }

            // Rotates, shifts and bit operations
            OpKind::RotateA => {
                let result = alu::rotate_a(op.arg('o'), self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
            }
            OpKind::ShiftR => {
                let r = op.arg('r');
                let value = self.shift(op.arg('o'), self.get_r(r));
                self.set_r(r, value);
            }
            OpKind::ShiftMem(base) => {
                let target = cell(op, base);
                let value = target.get(&self.regs, bus);
                let value = self.shift(op.arg('o'), value);
                target.set(&self.regs, bus, value);
            }
            OpKind::BitR => {
                let value = self.get_r(op.arg('r'));
                self.regs.f = alu::bit(op.arg('b'), value, value, self.regs.f);
            }
            OpKind::BitMem(base) => {
                // Bits 5 and 3 leak from the internal address latch; the
                // effective address high byte is the documented behaviour
                // for (IX+d) and the usual case for (HL).
                let address = cell(op, base).address(&self.regs);
                let value = bus.read(address);
                self.regs.f = alu::bit(op.arg('b'), value, (address >> 8) as u8, self.regs.f);
            }
            OpKind::ResR | OpKind::SetR => {
                let r = op.arg('r');
                let value = modify_bit(kind == OpKind::SetR, op.arg('b'), self.get_r(r));
                self.set_r(r, value);
            }
            OpKind::ResMem(base) | OpKind::SetMem(base) => {
                let target = cell(op, base);
                let value = target.get(&self.regs, bus);
                let set = matches!(kind, OpKind::SetMem(_));
                target.set(&self.regs, bus, modify_bit(set, op.arg('b'), value));
            }
            OpKind::Rrd | OpKind::Rld => {
                let address = self.regs.hl();
                let mem = bus.read(address);
                let a = self.regs.a;
                let (new_a, new_mem) = if kind == OpKind::Rrd {
                    ((a & 0xF0) | (mem & 0x0F), (a << 4) | (mem >> 4))
                } else {
                    ((a & 0xF0) | (mem >> 4), (mem << 4) | (a & 0x0F))
                };
                bus.write(address, new_mem);
                self.regs.a = new_a;
                self.regs.f = (self.regs.f & CF) | sz53p(new_a);
            }

            // Control flow
            OpKind::Jp => self.regs.pc = op.arg('n') as u16,
            OpKind::JpCond => {
                if self.condition(op.arg('c')) {
                    self.regs.pc = op.arg('n') as u16;
                } else {
                    op.set_alternate(true);
                }
            }
            OpKind::JpWide(base) => self.regs.pc = self.regs.get16(wide(op, base)),
            OpKind::Jr => self.jump_relative(op.arg('e')),
            OpKind::JrCond => {
                if self.condition(op.arg('c')) {
                    self.jump_relative(op.arg('e'));
                } else {
                    op.set_alternate(true);
                }
            }
            OpKind::Djnz => {
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b != 0 {
                    self.jump_relative(op.arg('e'));
                } else {
                    op.set_alternate(true);
                }
            }
            OpKind::Call => self.call(bus, op.arg('n') as u16),
            OpKind::CallCond => {
                if self.condition(op.arg('c')) {
                    self.call(bus, op.arg('n') as u16);
                } else {
                    op.set_alternate(true);
                }
            }
            OpKind::Ret => self.regs.pc = self.pop(bus),
            OpKind::RetCond => {
                if self.condition(op.arg('c')) {
                    self.regs.pc = self.pop(bus);
                } else {
                    op.set_alternate(true);
                }
            }
            OpKind::Reti => {
                self.regs.pc = self.pop(bus);
                self.iff1 = self.iff2;
                self.irq_serving = false;
            }
            OpKind::Retn => {
                self.regs.pc = self.pop(bus);
                self.iff1 = self.iff2;
                self.nmi_serving = false;
            }
            OpKind::Rst => self.call(bus, (op.arg('p') as u16 & 7) * 8),

            // Input and output
            OpKind::InAImm => {
                let port = (u16::from(self.regs.a) << 8) | (op.arg('n') as u16 & 0xFF);
                self.regs.a = bus.read_io(port);
            }
            OpKind::OutImmA => {
                let port = (u16::from(self.regs.a) << 8) | (op.arg('n') as u16 & 0xFF);
                bus.write_io(port, self.regs.a);
            }
            OpKind::InRC => {
                let value = bus.read_io(self.regs.bc());
                self.set_r(op.arg('r'), value);
                self.regs.f = (self.regs.f & CF) | sz53p(value);
            }
            OpKind::OutCR => {
                let value = self.get_r(op.arg('r'));
                bus.write_io(self.regs.bc(), value);
            }

            // Block instructions
            OpKind::BlockLoad { repeat } => self.block_load(op, bus, repeat),
            OpKind::BlockCompare { repeat } => self.block_compare(op, bus, repeat),
            OpKind::BlockIn { repeat } => self.block_in(op, bus, repeat),
            OpKind::BlockOut { repeat } => self.block_out(op, bus, repeat),
        }

        self.add_ticks(op.clock_periods());
    }

    /// Register selected by a 3-bit field. Encoding 6 never gets here: the
    /// decoder prunes it from every register template.
    fn get_r(&self, field: u32) -> u8 {
        Reg8::from_field(field).map_or(0xFF, |r| self.regs.get8(r))
    }

    fn set_r(&mut self, field: u32, value: u8) {
        if let Some(r) = Reg8::from_field(field) {
            self.regs.set8(r, value);
        }
    }

    /// Evaluate condition code (NZ Z NC C PO PE P M).
    fn condition(&self, cc: u32) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }

    fn alu(&mut self, select: u32, operand: u8) {
        let op = AluOp::from_field(select);
        let result = alu::alu8(op, self.regs.a, operand, self.regs.f & CF != 0);
        if op.writes_result() {
            self.regs.a = result.value;
        }
        self.regs.f = result.flags;
    }

    fn shift(&mut self, select: u32, value: u8) -> u8 {
        let result = alu::shift8(ShiftOp::from_field(select), value, self.regs.f & CF != 0);
        self.regs.f = result.flags;
        result.value
    }

    fn add16(&mut self, dst: Reg16, src: Reg16) {
        let (value, flags) = alu::add16(self.regs.get16(dst), self.regs.get16(src));
        self.regs.set16(dst, value);
        self.regs.f = (self.regs.f & (SF | ZF | PF)) | flags;
    }

    /// Jump by a signed offset from the address after the instruction.
    fn jump_relative(&mut self, offset: u32) {
        let offset = i16::from(offset as u8 as i8);
        self.regs.pc = self.regs.pc.wrapping_add_signed(offset);
    }

    fn call<B: Bus>(&mut self, bus: &mut B, target: u16) {
        self.push(bus, self.regs.pc);
        self.regs.pc = target;
    }

    /// Repeat forms re-execute themselves while `looping`; the final
    /// iteration takes the cheaper alternate cost.
    fn repeat(&mut self, op: &mut Operation, looping: bool) {
        if looping {
            self.regs.pc = self.regs.pc.wrapping_sub(op.pc_advance());
        } else {
            op.set_alternate(true);
        }
    }

    /// LDI, LDD, LDIR, LDDR.
    fn block_load<B: Bus>(&mut self, op: &mut Operation, bus: &mut B, repeat: bool) {
        let step = direction(op);
        let hl = self.regs.hl();
        let de = self.regs.de();
        let value = bus.read(hl);
        bus.write(de, value);

        self.regs.set16(Reg16::HL, hl.wrapping_add_signed(step));
        self.regs.set16(Reg16::DE, de.wrapping_add_signed(step));
        self.regs.decrement(Reg16::BC.into());
        let remaining = self.regs.bc() != 0;

        let n = value.wrapping_add(self.regs.a);
        self.regs.f = (self.regs.f & (SF | ZF | CF))
            | (n & XF)
            | if n & 0x02 != 0 { YF } else { 0 }
            | if remaining { PF } else { 0 };

        if repeat {
            self.repeat(op, remaining);
        }
    }

    /// CPI, CPD, CPIR, CPDR.
    fn block_compare<B: Bus>(&mut self, op: &mut Operation, bus: &mut B, repeat: bool) {
        let step = direction(op);
        let hl = self.regs.hl();
        let value = bus.read(hl);
        let result = self.regs.a.wrapping_sub(value);
        let half = (self.regs.a & 0x0F) < (value & 0x0F);
        let n = result.wrapping_sub(u8::from(half));

        self.regs.set16(Reg16::HL, hl.wrapping_add_signed(step));
        self.regs.decrement(Reg16::BC.into());
        let remaining = self.regs.bc() != 0;

        self.regs.f = (self.regs.f & CF)
            | NF
            | (sz53(result) & (SF | ZF))
            | if half { HF } else { 0 }
            | (n & XF)
            | if n & 0x02 != 0 { YF } else { 0 }
            | if remaining { PF } else { 0 };

        if repeat {
            self.repeat(op, remaining && result != 0);
        }
    }

    /// INI, IND, INIR, INDR.
    fn block_in<B: IoBus>(&mut self, op: &mut Operation, bus: &mut B, repeat: bool) {
        let step = direction(op);
        let value = bus.read_io(self.regs.bc());
        let hl = self.regs.hl();
        bus.write(hl, value);

        self.regs.set16(Reg16::HL, hl.wrapping_add_signed(step));
        self.regs.b = self.regs.b.wrapping_sub(1);

        let c = self.regs.c.wrapping_add(step as u8);
        let k = u16::from(value) + u16::from(c);
        self.regs.f = block_io_flags(value, k, self.regs.b);

        if repeat {
            self.repeat(op, self.regs.b != 0);
        }
    }

    /// OUTI, OUTD, OTIR, OTDR. B is decremented before it drives the port
    /// address.
    fn block_out<B: IoBus>(&mut self, op: &mut Operation, bus: &mut B, repeat: bool) {
        let step = direction(op);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let hl = self.regs.hl();
        let value = bus.read(hl);
        bus.write_io(self.regs.bc(), value);

        self.regs.set16(Reg16::HL, hl.wrapping_add_signed(step));

        let k = u16::from(value) + u16::from(self.regs.l);
        self.regs.f = block_io_flags(value, k, self.regs.b);

        if repeat {
            self.repeat(op, self.regs.b != 0);
        }
    }
}

/// IX or IY, from the prefix field.
fn index(op: &Operation) -> Reg16 {
    Reg16::index(op.arg('x'))
}

fn wide(op: &Operation, base: Base) -> Reg16 {
    match base {
        Base::Hl => Reg16::HL,
        Base::Index => index(op),
    }
}

/// `(HL)` or `(IX+d)` / `(IY+d)`.
fn cell(op: &Operation, base: Base) -> Indirect {
    match base {
        Base::Hl => Indirect::new(Reg16::HL, 0),
        Base::Index => Indirect::new(index(op), op.arg('d') as u8 as i8),
    }
}

/// +1 for the I forms of block instructions, -1 for the D forms.
fn direction(op: &Operation) -> i16 {
    if op.arg('i') == 0 { 1 } else { -1 }
}

fn modify_bit(set: bool, bit: u32, value: u8) -> u8 {
    let mask = 1u8 << (bit & 7);
    if set { value | mask } else { value & !mask }
}

/// Flags after a block I/O step. `k` is the transferred byte plus the low
/// byte of the other address register.
fn block_io_flags(value: u8, k: u16, b: u8) -> u8 {
    let mut f = sz53(b);
    if value & 0x80 != 0 {
        f |= NF;
    }
    if k > 0xFF {
        f |= HF | CF;
    }
    if parity((k as u8 & 7) ^ b) {
        f |= PF;
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    /// Run a program from 0 until HALT.
    fn run(program: &[u8], setup: impl FnOnce(&mut Z80, &mut SimpleBus)) -> (Z80, SimpleBus) {
        let mut cpu = Z80::new();
        let mut bus = SimpleBus::new();
        bus.load(0, program);
        setup(&mut cpu, &mut bus);
        let mut op = Operation::new();
        for _ in 0..10_000 {
            cpu.fetch_next_operation(&mut bus, &mut op).unwrap();
            cpu.execute(&mut op, &mut bus);
            if cpu.halted {
                return (cpu, bus);
            }
        }
        panic!("program did not halt");
    }

    #[test]
    fn rrd_and_rld() {
        let (cpu, bus) = run(&[0xED, 0x67, 0x76], |cpu, bus| {
            cpu.regs.a = 0x84;
            cpu.regs.set16(Reg16::HL, 0x5000);
            bus.load(0x5000, &[0x20]);
        });
        assert_eq!(cpu.regs.a, 0x80);
        assert_eq!(bus.peek(0x5000), 0x42);

        let (cpu, bus) = run(&[0xED, 0x6F, 0x76], |cpu, bus| {
            cpu.regs.a = 0x7A;
            cpu.regs.set16(Reg16::HL, 0x5000);
            bus.load(0x5000, &[0x31]);
        });
        assert_eq!(cpu.regs.a, 0x73);
        assert_eq!(bus.peek(0x5000), 0x1A);
    }

    #[test]
    fn cpir_stops_on_match() {
        let (cpu, _) = run(&[0xED, 0xB1, 0x76], |cpu, bus| {
            cpu.regs.a = 0x33;
            cpu.regs.set16(Reg16::HL, 0x4000);
            cpu.regs.set16(Reg16::BC, 0x0010);
            bus.load(0x4000, &[0x11, 0x22, 0x33, 0x44]);
        });
        assert_eq!(cpu.regs.hl(), 0x4003);
        assert_eq!(cpu.regs.bc(), 0x000D);
        assert_ne!(cpu.regs.f & ZF, 0);
        assert_ne!(cpu.regs.f & PF, 0);
    }

    #[test]
    fn otir_writes_every_byte() {
        let (cpu, bus) = run(&[0xED, 0xB3, 0x76], |cpu, bus| {
            cpu.regs.set16(Reg16::HL, 0x4000);
            cpu.regs.set16(Reg16::BC, 0x0398);
            bus.load(0x4000, &[0x01, 0x02, 0x03]);
        });
        assert_eq!(cpu.regs.b, 0);
        assert_eq!(cpu.regs.hl(), 0x4003);
        assert_eq!(bus.port_output(0x98), 0x03);
        assert_ne!(cpu.regs.f & ZF, 0);
    }

    #[test]
    fn indexed_bit_operations() {
        // SET 7,(IY-1) ; BIT 7,(IY-1) ; HALT
        let (cpu, bus) = run(&[0xFD, 0xCB, 0xFF, 0xFE, 0xFD, 0xCB, 0xFF, 0x7E, 0x76], |cpu, _| {
            cpu.regs.iy = 0x6001;
        });
        assert_eq!(bus.peek(0x6000), 0x80);
        assert_eq!(cpu.regs.f & ZF, 0);
        assert_ne!(cpu.regs.f & SF, 0);
        // Bits 5 and 3 come from the address high byte (0x60).
        assert_eq!(cpu.regs.f & (YF | XF), YF);
    }

    #[test]
    fn ld_a_i_copies_iff2() {
        let (cpu, _) = run(&[0xFB, 0x3E, 0x80, 0xED, 0x47, 0xED, 0x57, 0x76], |_, _| {});
        assert_eq!(cpu.regs.a, 0x80);
        assert_ne!(cpu.regs.f & PF, 0);
        assert_ne!(cpu.regs.f & SF, 0);
    }

    #[test]
    fn block_io_parity() {
        assert_eq!(block_io_flags(0x80, 0x100, 0), ZF | NF | HF | CF | PF);
        assert_eq!(block_io_flags(0x01, 0x02, 1), PF);
    }
}
