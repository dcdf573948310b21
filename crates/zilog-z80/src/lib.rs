//! Table-driven Z80 CPU emulator.
//!
//! Instructions are declared once in a catalog of bit patterns and mnemonic
//! templates. The catalog is compiled into a byte-indexed decode table, and
//! each fetch binds the matching entry to its operand fields in a reusable
//! [`Operation`] buffer. Executing the operation applies its effect and
//! reports the clock periods it took.
//!
//! ```
//! use emu_core::SimpleBus;
//! use zilog_z80::{Operation, Z80};
//!
//! let mut cpu = Z80::new();
//! let mut bus = SimpleBus::new();
//! bus.load(0, &[0x3E, 0x2A, 0x76]); // LD A,$2A ; HALT
//!
//! let mut op = Operation::new();
//! cpu.fetch_next_operation(&mut bus, &mut op).unwrap();
//! assert_eq!(op.mnemonic(), "LD A,$2A");
//! cpu.execute(&mut op, &mut bus);
//! assert_eq!(cpu.regs().a, 0x2A);
//! assert_eq!(op.clock_periods(), 7);
//! ```

pub mod alu;
mod catalog;
mod cpu;
mod decode;
mod error;
mod fetcher;
pub mod flags;
mod functions;
mod interrupt;
mod operation;
mod pattern;
mod registers;

pub use catalog::{Base, CATALOG, GenericOperation, OpKind};
pub use cpu::{RegisterInfo, Z80, Z80Config};
pub use decode::{Collision, CollisionPolicy, DecodeTable};
pub use error::{ByteTrace, CatalogError, DecodeError};
pub use fetcher::{BusDataFetcher, CodeFetcher, MemoryFetcher};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use functions::{Function, Segment, Template};
pub use interrupt::{InterruptLines, InterruptMode, InterruptRequester};
pub use operation::Operation;
pub use pattern::{FIELD_COUNT, MAX_BYTES, Pattern, field_index, normalize};
pub use registers::{Indirect, Reg8, Reg16, Register, Registers};
