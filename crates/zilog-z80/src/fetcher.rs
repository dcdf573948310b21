//! Byte sources for the decoder.
//!
//! Decoding reads the instruction twice: once while walking the decode
//! table, and again while extracting field values. Fetchers therefore
//! remember what they produced and can replay it with [`CodeFetcher::restart`].

use emu_core::Bus;

use crate::pattern::MAX_BYTES;

/// A source of opcode bytes.
pub trait CodeFetcher {
    /// Next byte of the instruction.
    fn fetch_next_byte(&mut self) -> u8;

    /// Forget everything fetched so far. The next fetch produces a fresh
    /// first byte.
    fn reset(&mut self);

    /// Replay from the first byte without going back to the source.
    fn restart(&mut self);

    /// Bytes produced since the last reset or restart.
    fn consumed(&self) -> &[u8];
}

/// Fetches from memory starting at the program counter.
pub struct MemoryFetcher<'a, B: Bus> {
    bus: &'a mut B,
    start: u16,
    cache: [u8; MAX_BYTES],
    cached: usize,
    pos: usize,
}

impl<'a, B: Bus> MemoryFetcher<'a, B> {
    pub fn new(bus: &'a mut B, start: u16) -> Self {
        Self {
            bus,
            start,
            cache: [0; MAX_BYTES],
            cached: 0,
            pos: 0,
        }
    }

    /// Address of the first byte.
    #[must_use]
    pub fn start(&self) -> u16 {
        self.start
    }
}

impl<B: Bus> CodeFetcher for MemoryFetcher<'_, B> {
    fn fetch_next_byte(&mut self) -> u8 {
        let byte = if self.pos < self.cached {
            self.cache[self.pos]
        } else {
            let byte = self.bus.read(self.start.wrapping_add(self.pos as u16));
            if self.cached < MAX_BYTES {
                self.cache[self.cached] = byte;
                self.cached += 1;
            }
            byte
        };
        self.pos += 1;
        byte
    }

    fn reset(&mut self) {
        self.cached = 0;
        self.pos = 0;
    }

    fn restart(&mut self) {
        self.pos = 0;
    }

    fn consumed(&self) -> &[u8] {
        &self.cache[..self.pos.min(self.cached)]
    }
}

/// Supplies the byte a device drives onto the data bus during a mode 0
/// interrupt acknowledge, followed by zeros.
#[derive(Debug, Clone)]
pub struct BusDataFetcher {
    bytes: [u8; MAX_BYTES],
    pos: usize,
}

impl BusDataFetcher {
    #[must_use]
    pub fn new(data: u8) -> Self {
        Self {
            bytes: [data, 0, 0, 0],
            pos: 0,
        }
    }
}

impl CodeFetcher for BusDataFetcher {
    fn fetch_next_byte(&mut self) -> u8 {
        let byte = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn restart(&mut self) {
        self.pos = 0;
    }

    fn consumed(&self) -> &[u8] {
        &self.bytes[..self.pos.min(MAX_BYTES)]
    }
}

/// Bytes from a fixed buffer, zeros past its end.
#[cfg(test)]
pub(crate) struct SliceFetcher {
    data: Vec<u8>,
    pos: usize,
}

#[cfg(test)]
impl SliceFetcher {
    pub(crate) fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

#[cfg(test)]
impl CodeFetcher for SliceFetcher {
    fn fetch_next_byte(&mut self) -> u8 {
        let byte = self.data.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn restart(&mut self) {
        self.pos = 0;
    }

    fn consumed(&self) -> &[u8] {
        &self.data[..self.pos.min(self.data.len())]
    }
}
