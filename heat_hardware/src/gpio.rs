//! Raspberry Pi backends: the bus data line on a GPIO pin, bit-banged
//! serial pins for the thermocouple converter, and the relay byte over
//! I2C to the port expander driving the relay board.

use heat_traits::{RelayPort, SpiLine, WireLine};
use rppal::gpio::{Gpio, InputPin, IoPin, Mode, OutputPin};
use rppal::i2c::I2c;

use crate::error::{HwError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Open-drain bus line on one BCM pin.
///
/// The output latch stays low; "writing" means switching the pin to
/// output, "releasing" switches it back to input and lets the external
/// pull-up raise the line.
pub struct GpioWireLine {
    pin: IoPin,
}

impl GpioWireLine {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut pin = gpio.get(bcm_pin).map_err(gpio_err)?.into_io(Mode::Input);
        pin.set_low();
        Ok(Self { pin })
    }
}

impl WireLine for GpioWireLine {
    fn clear(&mut self) {
        self.pin.set_low();
    }

    fn set_dir_write(&mut self) {
        self.pin.set_mode(Mode::Output);
    }

    fn set_dir_read(&mut self) {
        self.pin.set_mode(Mode::Input);
    }

    fn is_set(&self) -> bool {
        self.pin.is_high()
    }
}

/// Three-pin serial link to the thermocouple converter.
pub struct GpioSpiLine {
    clk: OutputPin,
    cs: OutputPin,
    miso: InputPin,
}

impl GpioSpiLine {
    pub fn new(clk_pin: u8, cs_pin: u8, miso_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let clk = gpio.get(clk_pin).map_err(gpio_err)?.into_output();
        let mut cs = gpio.get(cs_pin).map_err(gpio_err)?.into_output();
        let miso = gpio.get(miso_pin).map_err(gpio_err)?.into_input();
        // Deselected until a sample starts.
        cs.set_high();
        Ok(Self { clk, cs, miso })
    }
}

impl SpiLine for GpioSpiLine {
    fn select(&mut self) {
        self.cs.set_low();
    }

    fn deselect(&mut self) {
        self.cs.set_high();
    }

    fn clock_high(&mut self) {
        self.clk.set_high();
    }

    fn clock_low(&mut self) {
        self.clk.set_low();
    }

    fn data_set(&self) -> bool {
        self.miso.is_high()
    }
}

/// Relay byte over I2C to a port-expander driver.
pub struct I2cRelayPort {
    i2c: I2c,
}

impl I2cRelayPort {
    pub fn new(addr: u8) -> Result<Self> {
        let mut i2c = I2c::new().map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(u16::from(addr))
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(Self { i2c })
    }
}

impl RelayPort for I2cRelayPort {
    fn write(&mut self, bits: u8) -> Result<(), BoxError> {
        self.i2c
            .write(&[bits])
            .map_err(|e| Box::new(HwError::I2c(e.to_string())) as BoxError)?;
        tracing::trace!("relay write: {bits:08b}");
        Ok(())
    }
}
