//! Decode and catalog errors.

use thiserror::Error;

/// Raw opcode bytes, printed as `DD CB 05 46`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteTrace(pub Vec<u8>);

impl std::fmt::Display for ByteTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Failure to turn the byte stream into an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes match no catalog entry. The stream is illegal or the
    /// catalog has a gap; callers usually log this and stop the fetch loop.
    #[error("invalid opcode {bytes} at {address:#06X}")]
    InvalidOpcode { address: u16, bytes: ByteTrace },

    /// The decode table selected an operation whose pattern then rejected
    /// the same bytes. This is a table construction bug.
    #[error("{mnemonic} selected for {bytes} at {address:#06X} but its pattern does not match")]
    PatternMismatch {
        address: u16,
        mnemonic: &'static str,
        bytes: ByteTrace,
    },
}

impl DecodeError {
    /// Whether the error indicates a bug in the engine rather than in the
    /// program being run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PatternMismatch { .. })
    }

    /// Address the failing fetch started at.
    #[must_use]
    pub fn address(&self) -> u16 {
        match self {
            Self::InvalidOpcode { address, .. } | Self::PatternMismatch { address, .. } => {
                *address
            }
        }
    }
}

/// A malformed catalog entry or an overlap the build refused to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("pattern {pattern:?} is {bits} bits, not a whole number of bytes")]
    PartialByte { pattern: String, bits: usize },

    #[error("pattern {pattern:?} is longer than 4 bytes")]
    TooLong { pattern: String },

    #[error("pattern {pattern:?} contains {found:?}")]
    BadPatternChar { pattern: String, found: char },

    #[error("mnemonic {mnemonic:?} calls unknown function {name:?}")]
    UnknownFunction { mnemonic: String, name: String },

    #[error("mnemonic {mnemonic:?} has a malformed function call")]
    MalformedCall { mnemonic: String },

    #[error("mnemonic {mnemonic:?} uses field {field:?} absent from its pattern")]
    UnboundField { mnemonic: String, field: char },

    #[error("{first} and {second} both match {bytes}")]
    Collision {
        first: &'static str,
        second: &'static str,
        bytes: ByteTrace,
    },
}
