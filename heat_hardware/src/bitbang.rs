//! Bit-banged single-wire transport.
//!
//! Standard-speed schedule: 480/10/50/420 us around the reset presence
//! window, 2/13/45/1 us around each bit slot. On a hosted kernel the
//! delays are best effort; the protocol tolerates slots stretching long,
//! not short.

use std::time::Duration;

use heat_traits::{Clock, WireBus, WireLine};

use crate::error::HwError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// `WireBus` over a raw open-drain line.
pub struct BitBangWire<L, C> {
    line: L,
    clock: C,
}

impl<L: WireLine, C: Clock> BitBangWire<L, C> {
    pub fn new(line: L, clock: C) -> Self {
        Self { line, clock }
    }

    pub fn into_line(self) -> L {
        self.line
    }

    fn delay_us(&self, us: u64) {
        self.clock.sleep(Duration::from_micros(us));
    }

    /// One bit slot: pull low, release early for a read or a 1, sample
    /// mid-slot. Writing a 0 keeps the line held for the full slot; the
    /// sample is then our own low level and gets discarded by the caller.
    fn io_bit(&mut self, bit: bool) -> bool {
        self.line.clear();
        self.line.set_dir_write();
        self.delay_us(2);
        if bit {
            self.line.set_dir_read();
        }
        self.delay_us(13);
        let sampled = self.line.is_set();
        self.delay_us(45);
        self.line.set_dir_read();
        self.delay_us(1);
        sampled
    }
}

impl<L: WireLine, C: Clock> WireBus for BitBangWire<L, C> {
    fn reset(&mut self) -> Result<bool, BoxError> {
        self.line.clear();
        self.line.set_dir_write();
        self.delay_us(480);
        self.line.set_dir_read();
        self.delay_us(10);
        if !self.line.is_set() {
            // No device answers this early in the window; only a short
            // can hold the line down.
            return Err(Box::new(HwError::BusShorted));
        }
        self.delay_us(50);
        let present = !self.line.is_set();
        self.delay_us(420);
        Ok(present)
    }

    fn read_bit(&mut self) -> Result<bool, BoxError> {
        Ok(self.io_bit(true))
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BoxError> {
        self.io_bit(bit);
        Ok(())
    }
}
