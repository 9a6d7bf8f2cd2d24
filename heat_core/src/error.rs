use thiserror::Error;

/// Protocol-level failures on the single-wire bus.
///
/// These are returned, never panicked; the caller's policy is to log and
/// retry on the next cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus reset saw no presence pulse")]
    ResetFailed,
    #[error("search conflict at byte {byte_pos} mask {bit_mask:#04x} after branch {polarity}")]
    Conflict {
        byte_pos: u8,
        bit_mask: u8,
        /// Branch bit most recently written back before the violating
        /// sample; attributes which write silenced the population.
        polarity: bool,
    },
    #[error("address crc mismatch: computed {expected:#04x}, device sent {found:#04x}")]
    CrcMismatch { expected: u8, found: u8 },
    #[error("line fault: {0}")]
    Line(String),
}

impl BusError {
    /// Transport faults come from the line driver, not the protocol, and
    /// are the only kind worth bubbling past the per-cycle retry policy.
    pub fn is_transport(&self) -> bool {
        matches!(self, BusError::Line(_))
    }
}

/// Failures parsing a textual device address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("expected 8 colon-separated bytes, got {0}")]
    BadLength(usize),
    #[error("byte {pos} is not two hex digits")]
    BadByte { pos: usize },
    #[error("address crc mismatch: computed {expected:#04x}, text says {found:#04x}")]
    CrcMismatch { expected: u8, found: u8 },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
