//! CPU core trait.

use crate::{IoBus, Ticks};

/// A CPU core driven one instruction at a time.
///
/// The bus is passed in, not owned, so the host can share it with other
/// components between steps. Timing is whole-instruction: `step` reports the
/// clock periods the instruction consumed and the host paces the loop.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Error raised when the instruction stream cannot be decoded.
    type Error;

    /// Accept any pending interrupt, then fetch and execute one instruction.
    ///
    /// Returns the clock periods consumed.
    fn step<B: IoBus>(&mut self, bus: &mut B) -> Result<Ticks, Self::Error>;

    /// Returns the current program counter.
    ///
    /// Returns `u32` so hosts can treat CPUs of different address widths
    /// alike. 16-bit CPUs zero-extend.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the last instruction executed was a halt.
    fn is_halted(&self) -> bool;

    /// Request a maskable interrupt. Returns true if interrupts are
    /// currently enabled; the request stays pending either way.
    fn interrupt(&mut self) -> bool;

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
