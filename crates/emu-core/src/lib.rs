//! Contracts shared between a CPU core and the machine that hosts it.
//!
//! The CPU never owns memory or peripherals. It sees a 64K memory space and a
//! port space through [`Bus`] and [`IoBus`], and the host drives it one
//! instruction at a time through [`Cpu`].

mod bus;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, IoBus, SimpleBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
