//! Memory and I/O port interfaces.

/// Memory interface.
///
/// The CPU reaches the 64K address space only through this trait. The bus
/// handles address decoding and routing to RAM, ROM or memory-mapped devices.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a little-endian word. The high byte address wraps at 64K.
    fn read_word(&mut self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word. The high byte address wraps at 64K.
    fn write_word(&mut self, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(address, lo);
        self.write(address.wrapping_add(1), hi);
    }
}

/// A bus that also has a separate I/O port space.
///
/// The Z80 drives a full 16-bit address during IN and OUT (the upper byte is
/// A or B depending on the instruction). Hosts that decode only 256 ports
/// use the low byte.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);

    /// Read a little-endian word from two consecutive ports.
    fn read_io_word(&mut self, port: u16) -> u16 {
        let lo = self.read_io(port);
        let hi = self.read_io(port.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word to two consecutive ports.
    fn write_io_word(&mut self, port: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_io(port, lo);
        self.write_io(port.wrapping_add(1), hi);
    }
}

/// Flat 64K RAM with 256 latched I/O ports.
///
/// Port reads return whatever was set with [`SimpleBus::set_port_input`]
/// (0xFF when nothing drives the port); port writes are latched and can be
/// inspected with [`SimpleBus::port_output`].
pub struct SimpleBus {
    ram: Box<[u8; 0x1_0000]>,
    port_in: [u8; 256],
    port_out: [u8; 256],
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x1_0000]),
            port_in: [0xFF; 256],
            port_out: [0; 256],
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64K.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read RAM without going through the bus.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Read a little-endian word from RAM without going through the bus.
    #[must_use]
    pub fn peek_word(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.peek(address), self.peek(address.wrapping_add(1))])
    }

    /// Set the value returned by reads of `port` (low byte decoded).
    pub fn set_port_input(&mut self, port: u8, value: u8) {
        self.port_in[usize::from(port)] = value;
    }

    /// Last value written to `port` (low byte decoded).
    #[must_use]
    pub fn port_output(&self, port: u8) -> u8 {
        self.port_out[usize::from(port)]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

impl IoBus for SimpleBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.port_in[usize::from(port & 0xFF)]
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.port_out[usize::from(port & 0xFF)] = value;
    }
}
