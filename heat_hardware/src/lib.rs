#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Hardware backends for the heating-plant controller.
//!
//! Everything electrical lives here: the timed single-wire transport,
//! the thermocouple frame shifter, hosted simulations for demo runs, and
//! (behind the `hardware` feature, Linux only) Raspberry Pi GPIO and I2C
//! implementations of the capability traits.

pub mod bitbang;
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod max6675;
pub mod sim;

pub use bitbang::BitBangWire;
pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioSpiLine, GpioWireLine, I2cRelayPort};
pub use max6675::Max6675;
pub use sim::{LoggingRelayPort, SimulatedProbe};
