pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Raw open-drain pin underneath the single-wire bus.
///
/// Implementations only ever drive the line low; releasing it (read
/// direction) lets the pull-up raise it. Pin writes on the supported
/// backends cannot fail, so these methods are infallible.
pub trait WireLine {
    /// Latch the output register low (takes effect in write direction).
    fn clear(&mut self);
    /// Drive the line (output, low).
    fn set_dir_write(&mut self);
    /// Release the line (input, pulled up).
    fn set_dir_read(&mut self);
    /// Sample the line level.
    fn is_set(&self) -> bool;
}

/// Bit/byte transport over a single-wire bus.
///
/// `reset` returns whether any device answered with a presence pulse.
/// Bytes travel least-significant bit first.
pub trait WireBus {
    fn reset(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    fn read_bit(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    fn write_bit(&mut self, bit: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn read_byte(&mut self) -> Result<u8, Box<dyn std::error::Error + Send + Sync>> {
        let mut value = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    fn write_byte(&mut self, value: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for i in 0..8 {
            self.write_bit(value & (1 << i) != 0)?;
        }
        Ok(())
    }
}

/// Three-pin serial link to a MAX6675-style thermocouple converter.
pub trait SpiLine {
    fn select(&mut self);
    fn deselect(&mut self);
    fn clock_high(&mut self);
    fn clock_low(&mut self);
    /// Sample the data-out pin.
    fn data_set(&self) -> bool;
}

/// One raw 16-bit frame from the thermocouple converter.
pub trait ThermocoupleProbe {
    fn sample(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

/// Register-style relay driver taking one byte per update.
///
/// The caller owns the byte's layout; this is only the wire.
pub trait RelayPort {
    fn write(&mut self, bits: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
