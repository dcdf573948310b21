//! Interrupt request lines.
//!
//! Requests are edge-triggered pending flags. Peripherals raise them from
//! any thread through an [`InterruptRequester`]; the CPU takes them at the
//! start of its next fetch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Z80 interrupt modes, selected by IM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterruptMode {
    /// Execute the instruction the device puts on the data bus.
    #[default]
    Mode0,
    /// Call 0x0038.
    Mode1,
    /// Call through the vector table at `(I << 8) | (bus data & 0xFE)`.
    Mode2,
}

impl InterruptMode {
    /// Mode selected by the IM opcode field (0, -, 1, 2).
    #[must_use]
    pub const fn from_field(field: u32) -> Option<Self> {
        match field {
            0 => Some(Self::Mode0),
            2 => Some(Self::Mode1),
            3 => Some(Self::Mode2),
            _ => None,
        }
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Mode0 => 0,
            Self::Mode1 => 1,
            Self::Mode2 => 2,
        }
    }
}

impl fmt::Display for InterruptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IM{}", self.number())
    }
}

/// Pending request flags shared between the CPU and its requesters.
#[derive(Debug)]
pub struct InterruptLines {
    irq: AtomicBool,
    nmi: AtomicBool,
    vector: AtomicU8,
}

impl Default for InterruptLines {
    fn default() -> Self {
        Self {
            irq: AtomicBool::new(false),
            nmi: AtomicBool::new(false),
            // An undriven bus reads 0xFF, which is RST 38h in mode 0.
            vector: AtomicU8::new(0xFF),
        }
    }
}

impl InterruptLines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_irq(&self) {
        self.irq.store(true, Ordering::Release);
    }

    pub fn request_nmi(&self) {
        self.nmi.store(true, Ordering::Release);
    }

    pub fn set_vector(&self, value: u8) {
        self.vector.store(value, Ordering::Release);
    }

    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.irq.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn vector(&self) -> u8 {
        self.vector.load(Ordering::Acquire)
    }

    /// Clear and return the NMI flag.
    pub fn take_nmi(&self) -> bool {
        self.nmi.swap(false, Ordering::AcqRel)
    }

    /// Clear and return the IRQ flag.
    pub fn take_irq(&self) -> bool {
        self.irq.swap(false, Ordering::AcqRel)
    }

    pub fn clear(&self) {
        self.irq.store(false, Ordering::Release);
        self.nmi.store(false, Ordering::Release);
    }
}

/// Cloneable handle for raising interrupts from peripherals, possibly on
/// other threads.
#[derive(Debug, Clone)]
pub struct InterruptRequester {
    lines: Arc<InterruptLines>,
}

impl InterruptRequester {
    pub(crate) fn new(lines: Arc<InterruptLines>) -> Self {
        Self { lines }
    }

    /// Raise the maskable interrupt. It stays pending until accepted.
    pub fn request_irq(&self) {
        self.lines.request_irq();
    }

    pub fn request_nmi(&self) {
        self.lines.request_nmi();
    }

    /// Byte the device drives onto the data bus when the IRQ is
    /// acknowledged: the instruction in mode 0, the table offset in mode 2.
    pub fn set_interrupt_response_vector(&self, value: u8) {
        self.lines.set_vector(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_clears_the_flag() {
        let lines = InterruptLines::new();
        assert!(!lines.take_irq());
        lines.request_irq();
        assert!(lines.irq_pending());
        assert!(lines.take_irq());
        assert!(!lines.irq_pending());
    }

    #[test]
    fn requester_shares_lines() {
        let lines = Arc::new(InterruptLines::new());
        let requester = InterruptRequester::new(Arc::clone(&lines));
        requester.request_nmi();
        requester.set_interrupt_response_vector(0x20);
        assert!(lines.nmi_pending());
        assert_eq!(lines.vector(), 0x20);
    }

    #[test]
    fn mode_field_has_a_hole() {
        assert_eq!(InterruptMode::from_field(0), Some(InterruptMode::Mode0));
        assert_eq!(InterruptMode::from_field(1), None);
        assert_eq!(InterruptMode::from_field(2), Some(InterruptMode::Mode1));
        assert_eq!(InterruptMode::from_field(3), Some(InterruptMode::Mode2));
        assert_eq!(InterruptMode::Mode2.to_string(), "IM2");
    }
}
