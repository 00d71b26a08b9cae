//! Serial cradle transport: open at a conservative starting baud, let CMP
//! negotiate the device's preferred rate, then reopen the port at that rate.

use crate::error::TransportResult;
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

pub const INITIAL_BAUD: u32 = 9600;
const OPEN_TIMEOUT: Duration = Duration::from_secs(1);

pub fn open(path: &str, baud: u32) -> TransportResult<SerialStream> {
    info!(path, baud, "opening serial port");
    let stream = tokio_serial::new(path, baud)
        .timeout(OPEN_TIMEOUT)
        .open_native_async()?;
    Ok(stream)
}

/// Reopens the port at `baud`, the rate negotiated during the CMP handshake.
/// `tokio-serial` has no in-place baud change, so the port is dropped and
/// reopened.
pub fn reopen_at_negotiated_baud(path: &str, baud: u32) -> TransportResult<SerialStream> {
    info!(path, baud, "reopening serial port at negotiated baud");
    open(path, baud)
}
