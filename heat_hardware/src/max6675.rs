//! MAX6675 thermocouple converter over a three-pin serial link.

use std::time::Duration;

use heat_traits::{Clock, SpiLine, ThermocoupleProbe};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shifts one 16-bit frame out of the converter, MSB first.
///
/// The frame goes to the core codec undecoded; bit 2 carries the
/// open-thermocouple flag.
pub struct Max6675<S, C> {
    spi: S,
    clock: C,
}

impl<S: SpiLine, C: Clock> Max6675<S, C> {
    pub fn new(spi: S, clock: C) -> Self {
        Self { spi, clock }
    }

    fn settle(&self) {
        self.clock.sleep(Duration::from_millis(1));
    }
}

impl<S: SpiLine, C: Clock> ThermocoupleProbe for Max6675<S, C> {
    fn sample(&mut self) -> Result<u16, BoxError> {
        self.spi.select();
        self.settle();
        let mut frame = 0u16;
        for _ in 0..16 {
            self.spi.clock_low();
            self.settle();
            frame = (frame << 1) | u16::from(self.spi.data_set());
            self.spi.clock_high();
            self.settle();
        }
        self.spi.deselect();
        Ok(frame)
    }
}
