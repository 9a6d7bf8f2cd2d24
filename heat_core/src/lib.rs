#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Control core for a two-circuit heating plant (hardware-agnostic).
//!
//! All hardware interaction goes through the `heat_traits` capability
//! traits, so every path in here runs against simulated lines in tests.
//!
//! ## Architecture
//!
//! - **Discovery**: bit-level collision search over the single-wire bus
//!   (`onewire` module)
//! - **Sensing**: conversion/scratchpad protocol and the temperature codec
//!   (`sensor`, `temperature`)
//! - **Regulation**: one parameterized P/I/D law with saturation,
//!   anti-windup and a large-error bypass (`regulator`)
//! - **Cascades**: radiator and boiler policies composed over a shared
//!   frame with fail-safe counting (`cascade`, `radiator`, `boiler`)
//! - **Actuation**: single-owner relay byte and the overlapping
//!   two-actuator schedule (`actuator`)
//! - **Orchestration**: the fixed-period control cycle (`plant`)
//!
//! ## Fixed-point arithmetic
//!
//! Temperatures are `i32` sixteenths of a degree Celsius throughout;
//! valve drive is signed milliseconds. See the `fixed_point` module.

pub mod actuator;
pub mod boiler;
pub mod cascade;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod mocks;
pub mod onewire;
pub mod plant;
pub mod radiator;
pub mod regulator;
pub mod sensor;
pub mod temperature;

pub use actuator::{ActuatorBank, ActuatorCommand, Channel, Direction, RelayMap};
pub use boiler::BoilerCircuit;
pub use cascade::CascadeCore;
pub use config::{BoilerCfg, PlantCfg, RadiatorCfg, RegulatorCfg};
pub use error::{AddressParseError, BusError, Result};
pub use onewire::{crc8, DeviceAddress, SearchState};
pub use plant::{CycleSummary, PlantController};
pub use radiator::RadiatorCircuit;
pub use regulator::Regulator;
pub use temperature::Temperature;
