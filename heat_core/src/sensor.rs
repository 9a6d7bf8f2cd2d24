//! DS18x20 conversion and scratchpad read operations.
//!
//! Pure byte sequences over the abstract bus; all electrical timing lives
//! in the transport implementation.

use heat_traits::WireBus;

use crate::error::BusError;
use crate::onewire::{commands, crc8_update, DeviceAddress, FAMILY_DS18S20};
use crate::temperature::Temperature;

/// Broadcast a temperature conversion to every device on the bus.
pub fn convert_all<B: WireBus + ?Sized>(bus: &mut B) -> Result<(), BusError> {
    if !bus.reset().map_err(line_fault)? {
        return Err(BusError::ResetFailed);
    }
    bus.write_byte(commands::SKIP_ROM).map_err(line_fault)?;
    bus.write_byte(commands::CONVERT_T).map_err(line_fault)?;
    Ok(())
}

/// Poll until a device reports the conversion done, bounded by `max_polls`.
/// Returns whether completion was observed.
pub fn wait_conversion<B: WireBus + ?Sized>(
    bus: &mut B,
    max_polls: u32,
) -> Result<bool, BusError> {
    for _ in 0..max_polls {
        if bus.read_bit().map_err(line_fault)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Read one device's temperature with per-attempt retry.
///
/// Each attempt is reset, match, scratchpad read; the 9th scratchpad byte
/// must match the CRC8 of the first eight. Exhausted retries yield the
/// invalid sentinel, which the owning cascade absorbs as a fail tick.
pub fn read_temperature<B: WireBus + ?Sized>(
    bus: &mut B,
    addr: &DeviceAddress,
    retries: u32,
) -> Result<Temperature, BusError> {
    for attempt in 0..retries.max(1) {
        if !bus.reset().map_err(line_fault)? {
            continue;
        }
        bus.write_byte(commands::MATCH_ROM).map_err(line_fault)?;
        for &b in addr.bytes() {
            bus.write_byte(b).map_err(line_fault)?;
        }
        bus.write_byte(commands::READ_SCRATCHPAD).map_err(line_fault)?;

        let mut pad = [0u8; 9];
        let mut crc = 0u8;
        for slot in pad.iter_mut() {
            *slot = bus.read_byte().map_err(line_fault)?;
        }
        for &b in &pad[..8] {
            crc = crc8_update(crc, b);
        }
        if crc != pad[8] {
            tracing::debug!(%addr, attempt, "scratchpad crc mismatch, retrying");
            continue;
        }

        let t = Temperature::from_scratchpad(pad[0], pad[1], addr.family() == FAMILY_DS18S20);
        if t.is_valid() {
            return Ok(t);
        }
    }
    Ok(Temperature::INVALID)
}

fn line_fault(e: Box<dyn std::error::Error + Send + Sync>) -> BusError {
    BusError::Line(e.to_string())
}
